use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::file_dto::UploadedFile;
use crate::model::account::Account;
use crate::model::book::Book;
use crate::model::category::Category;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Category name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 1000, message = "Category description is required"))]
    pub description: String,
}

impl CategoryRequest {
    pub fn trimmed(self) -> Self {
        CategoryRequest {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
        }
    }
}

/// Book creation form: text fields as submitted plus the image parts.
#[derive(Debug, Clone, Default)]
pub struct NewBookForm {
    pub title: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub stock: Option<String>,
    /// Category id or name
    pub category: Option<String>,
    pub images: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub stock: Option<u32>,
    /// Category id or name
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&Category> for CategoryResponse {
    fn from(category: &Category) -> Self {
        CategoryResponse {
            id: category.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: category.name.clone(),
            description: category.description.clone(),
            created_at: category.created_at.clone(),
            updated_at: category.updated_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub price: f64,
    pub description: String,
    pub stock: u32,
    pub category: String,
    pub owner: String,
    pub images: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&Book> for BookResponse {
    fn from(book: &Book) -> Self {
        BookResponse {
            id: book.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: book.title.clone(),
            price: book.price,
            description: book.description.clone(),
            stock: book.stock,
            category: book.category.to_hex(),
            owner: book.owner.to_hex(),
            images: book.images.clone(),
            created_at: book.created_at.clone(),
            updated_at: book.updated_at.clone(),
        }
    }
}

/// Book with its category and owner resolved. A reference that no longer
/// resolves (e.g. the category was deleted) is rendered as `null`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub price: f64,
    pub description: String,
    pub stock: u32,
    pub category: Option<CategorySummary>,
    pub owner: Option<OwnerSummary>,
    pub images: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl BookView {
    pub fn new(book: &Book, category: Option<&Category>, owner: Option<&Account>) -> Self {
        BookView {
            id: book.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: book.title.clone(),
            price: book.price,
            description: book.description.clone(),
            stock: book.stock,
            category: category.map(|c| CategorySummary {
                id: c.id.map(|id| id.to_hex()).unwrap_or_default(),
                name: c.name.clone(),
            }),
            owner: owner.map(|a| OwnerSummary {
                id: a.id_string(),
                user_name: a.username.clone(),
                email: a.email.clone(),
            }),
            images: book.images.clone(),
            created_at: book.created_at.clone(),
            updated_at: book.updated_at.clone(),
        }
    }
}
