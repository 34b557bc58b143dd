use async_trait::async_trait;
use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::dto::catalog_dto::CategoryRequest;
use crate::model::category::Category;
use crate::repository::category_repo::CategoryRepository;
use crate::service::parse_object_id;
use crate::util::error::ServiceError;

#[async_trait]
pub trait CategoryService: Send + Sync {
    async fn create(&self, request: CategoryRequest) -> Result<Category, ServiceError>;
    async fn list(&self) -> Result<Vec<Category>, ServiceError>;
    async fn update(&self, id: &str, request: CategoryRequest) -> Result<Category, ServiceError>;
    /// Books that reference the category are left untouched.
    async fn delete(&self, id: &str) -> Result<Category, ServiceError>;
    async fn resolve_category(&self, reference: &str) -> Result<Category, ServiceError>;
}

/// Turns a category reference, either a 24-hex id or a name, into the stored category.
pub async fn resolve_category(repo: &dyn CategoryRepository, reference: &str) -> Result<Category, ServiceError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(ServiceError::Validation("Category is required".to_string()));
    }

    let found = match ObjectId::parse_str(reference) {
        Ok(id) => {
            debug!("Resolving category by id");
            repo.find_by_id(&id).await?
        }
        Err(_) => {
            debug!("Resolving category by name");
            repo.find_by_name(reference).await?
        }
    };

    found.ok_or_else(|| ServiceError::NotFound(format!("Category not found: {}", reference)))
}

pub struct CategoryServiceImpl {
    pub category_repo: Arc<dyn CategoryRepository>,
}

impl CategoryServiceImpl {
    pub fn new(category_repo: Arc<dyn CategoryRepository>) -> Self {
        Self { category_repo }
    }

    fn validated(request: CategoryRequest) -> Result<CategoryRequest, ServiceError> {
        let request = request.trimmed();
        request
            .validate()
            .map_err(|e| ServiceError::Validation(format!("Validation error: {}", e)))?;
        Ok(request)
    }
}

#[async_trait]
impl CategoryService for CategoryServiceImpl {
    #[instrument(skip(self, request), fields(name = %request.name))]
    async fn create(&self, request: CategoryRequest) -> Result<Category, ServiceError> {
        let request = Self::validated(request)?;

        if self.category_repo.find_by_name(&request.name).await?.is_some() {
            warn!("Category name already taken");
            return Err(ServiceError::Conflict("Category already exists".to_string()));
        }

        let created = self
            .category_repo
            .insert(Category {
                id: None,
                name: request.name,
                description: request.description,
                created_at: None,
                updated_at: None,
            })
            .await?;
        info!("Category created");
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<Category>, ServiceError> {
        Ok(self.category_repo.list().await?)
    }

    #[instrument(skip(self, request))]
    async fn update(&self, id: &str, request: CategoryRequest) -> Result<Category, ServiceError> {
        let id = parse_object_id(id, "category")?;
        let request = Self::validated(request)?;

        if self.category_repo.find_by_id(&id).await?.is_none() {
            return Err(ServiceError::NotFound("Category not found".to_string()));
        }
        if let Some(existing) = self.category_repo.find_by_name(&request.name).await? {
            if existing.id != Some(id) {
                return Err(ServiceError::Conflict("Category already exists".to_string()));
            }
        }

        let updated = self
            .category_repo
            .update(&id, &request.name, &request.description)
            .await?;
        info!("Category updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<Category, ServiceError> {
        let id = parse_object_id(id, "category")?;
        let deleted = self.category_repo.delete(&id).await?;
        info!("Category deleted");
        Ok(deleted)
    }

    async fn resolve_category(&self, reference: &str) -> Result<Category, ServiceError> {
        resolve_category(self.category_repo.as_ref(), reference).await
    }
}
