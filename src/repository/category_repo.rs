use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use chrono::Local;
use futures::TryStreamExt;
use mongodb::{
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Collection, Database,
};
use tracing::instrument;

use crate::model::category::Category;
use crate::repository::mongo::CATEGORIES;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn insert(&self, category: Category) -> RepositoryResult<Category>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Category>>;
    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Category>>;
    async fn list(&self) -> RepositoryResult<Vec<Category>>;
    async fn find_by_ids(&self, ids: &[ObjectId]) -> RepositoryResult<Vec<Category>>;
    async fn update(&self, id: &ObjectId, name: &str, description: &str) -> RepositoryResult<Category>;
    /// Removes the category and returns what was stored.
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<Category>;
}

pub struct CategoryRepositoryImpl {
    collection: Collection<Category>,
}

impl CategoryRepositoryImpl {
    pub fn new(db: &Database) -> Self {
        CategoryRepositoryImpl {
            collection: db.collection::<Category>(CATEGORIES),
        }
    }

    async fn collect(&self, filter: bson::Document) -> RepositoryResult<Vec<Category>> {
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        let cursor = self
            .collection
            .find(filter, options)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list categories: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to read categories: {}", e)))
    }
}

#[async_trait]
impl CategoryRepository for CategoryRepositoryImpl {
    #[instrument(skip(self, category), fields(name = %category.name))]
    async fn insert(&self, mut category: Category) -> RepositoryResult<Category> {
        category.id = Some(ObjectId::new());
        let now = Local::now().to_rfc3339();
        category.created_at = Some(now.clone());
        category.updated_at = Some(now);
        self.collection
            .insert_one(category.clone(), None)
            .await
            .map_err(|e| RepositoryError::from_mongo("Failed to insert category", e))?;
        Ok(category)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Category>> {
        self.collection
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find category by id: {}", e)))
    }

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Category>> {
        self.collection
            .find_one(doc! { "name": name }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find category by name: {}", e)))
    }

    async fn list(&self) -> RepositoryResult<Vec<Category>> {
        self.collect(doc! {}).await
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> RepositoryResult<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.collect(doc! { "_id": { "$in": ids.to_vec() } }).await
    }

    #[instrument(skip(self))]
    async fn update(&self, id: &ObjectId, name: &str, description: &str) -> RepositoryResult<Category> {
        let update = doc! { "$set": {
            "name": name,
            "description": description,
            "updatedAt": Local::now().to_rfc3339(),
        } };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.collection
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await
            .map_err(|e| RepositoryError::from_mongo("Failed to update category", e))?
            .ok_or_else(|| RepositoryError::not_found(format!("No category found for ID: {}", id)))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &ObjectId) -> RepositoryResult<Category> {
        self.collection
            .find_one_and_delete(doc! { "_id": id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to delete category: {}", e)))?
            .ok_or_else(|| RepositoryError::not_found(format!("No category found for ID: {}", id)))
    }
}
