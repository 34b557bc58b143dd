use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub price: f64,
    pub description: String,
    pub stock: u32,
    pub category: ObjectId,
    /// Account that created the book
    pub owner: ObjectId,
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Partial update of a book; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct BookChanges {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub stock: Option<u32>,
    pub category: Option<ObjectId>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.stock.is_none()
            && self.category.is_none()
    }

    pub fn apply_to(&self, book: &mut Book) {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(price) = self.price {
            book.price = price;
        }
        if let Some(description) = &self.description {
            book.description = description.clone();
        }
        if let Some(stock) = self.stock {
            book.stock = stock;
        }
        if let Some(category) = self.category {
            book.category = category;
        }
    }
}
