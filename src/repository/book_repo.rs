use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use chrono::Local;
use futures::TryStreamExt;
use mongodb::{
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Collection, Database,
};
use tracing::instrument;

use crate::model::book::{Book, BookChanges};
use crate::repository::mongo::BOOKS;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn insert(&self, book: Book) -> RepositoryResult<Book>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Book>>;
    /// Book with this exact title in this category, ignoring `exclude`
    async fn find_by_title_and_category(
        &self,
        title: &str,
        category: &ObjectId,
        exclude: Option<&ObjectId>,
    ) -> RepositoryResult<Option<Book>>;
    async fn list(&self) -> RepositoryResult<Vec<Book>>;
    async fn update(&self, id: &ObjectId, changes: BookChanges) -> RepositoryResult<Book>;
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<Book>;
}

pub struct BookRepositoryImpl {
    collection: Collection<Book>,
}

impl BookRepositoryImpl {
    pub fn new(db: &Database) -> Self {
        BookRepositoryImpl {
            collection: db.collection::<Book>(BOOKS),
        }
    }
}

#[async_trait]
impl BookRepository for BookRepositoryImpl {
    #[instrument(skip(self, book), fields(title = %book.title))]
    async fn insert(&self, mut book: Book) -> RepositoryResult<Book> {
        book.id = Some(ObjectId::new());
        let now = Local::now().to_rfc3339();
        book.created_at = Some(now.clone());
        book.updated_at = Some(now);
        self.collection
            .insert_one(book.clone(), None)
            .await
            .map_err(|e| RepositoryError::from_mongo("Failed to insert book", e))?;
        Ok(book)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Book>> {
        self.collection
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find book by id: {}", e)))
    }

    async fn find_by_title_and_category(
        &self,
        title: &str,
        category: &ObjectId,
        exclude: Option<&ObjectId>,
    ) -> RepositoryResult<Option<Book>> {
        let mut filter = doc! { "title": title, "category": category };
        if let Some(exclude) = exclude {
            filter.insert("_id", doc! { "$ne": exclude });
        }
        self.collection
            .find_one(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find book by title: {}", e)))
    }

    async fn list(&self) -> RepositoryResult<Vec<Book>> {
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let cursor = self
            .collection
            .find(doc! {}, options)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list books: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to read books: {}", e)))
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: &ObjectId, changes: BookChanges) -> RepositoryResult<Book> {
        let mut fields = Document::new();
        if let Some(title) = changes.title {
            fields.insert("title", title);
        }
        if let Some(price) = changes.price {
            fields.insert("price", price);
        }
        if let Some(description) = changes.description {
            fields.insert("description", description);
        }
        if let Some(stock) = changes.stock {
            // BSON has no unsigned integers
            fields.insert("stock", i64::from(stock));
        }
        if let Some(category) = changes.category {
            fields.insert("category", category);
        }
        fields.insert("updatedAt", Local::now().to_rfc3339());

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": fields }, options)
            .await
            .map_err(|e| RepositoryError::from_mongo("Failed to update book", e))?
            .ok_or_else(|| RepositoryError::not_found(format!("No book found for ID: {}", id)))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<Book> {
        self.collection
            .find_one_and_delete(doc! { "_id": id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to delete book: {}", e)))?
            .ok_or_else(|| RepositoryError::not_found(format!("No book found for ID: {}", id)))
    }
}
