use async_trait::async_trait;
use bson::oid::ObjectId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::dto::catalog_dto::{BookView, NewBookForm, UpdateBookRequest};
use crate::dto::file_dto::UploadedFile;
use crate::model::account::Account;
use crate::model::book::{Book, BookChanges};
use crate::repository::account_repo::AccountRepository;
use crate::repository::book_repo::BookRepository;
use crate::repository::category_repo::CategoryRepository;
use crate::service::category_service::resolve_category;
use crate::service::parse_object_id;
use crate::util::error::ServiceError;
use crate::util::minio::ObjectStorage;

pub const BOOK_FOLDER: &str = "books";
pub const MAX_BOOK_IMAGES: usize = 5;

#[async_trait]
pub trait BookService: Send + Sync {
    async fn create(&self, form: NewBookForm, owner: &Account) -> Result<Book, ServiceError>;
    async fn list(&self) -> Result<Vec<BookView>, ServiceError>;
    async fn update(&self, id: &str, request: UpdateBookRequest, caller: &Account) -> Result<Book, ServiceError>;
    async fn delete(&self, id: &str, caller: &Account) -> Result<Book, ServiceError>;
}

pub struct BookServiceImpl {
    pub book_repo: Arc<dyn BookRepository>,
    pub category_repo: Arc<dyn CategoryRepository>,
    pub account_repo: Arc<dyn AccountRepository>,
    pub storage: Arc<dyn ObjectStorage>,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn check_price(price: f64) -> Result<f64, ServiceError> {
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        Err(ServiceError::Validation("Price must be a non-negative number".to_string()))
    }
}

fn parse_price(value: &str) -> Result<f64, ServiceError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ServiceError::Validation("Price must be a non-negative number".to_string()))
        .and_then(check_price)
}

fn parse_stock(value: &str) -> Result<u32, ServiceError> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| ServiceError::Validation("Stock must be a non-negative integer".to_string()))
}

impl BookServiceImpl {
    pub fn new(
        book_repo: Arc<dyn BookRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        account_repo: Arc<dyn AccountRepository>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            book_repo,
            category_repo,
            account_repo,
            storage,
        }
    }

    /// Removes already stored images; failures are only logged.
    async fn discard_images(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.storage.remove(url).await {
                warn!("Failed to remove image {}: {}", url, e);
            }
        }
    }

    /// Uploads one at a time; on the first failure everything stored so far is removed.
    async fn upload_all(&self, images: &[UploadedFile]) -> Result<Vec<String>, ServiceError> {
        let mut urls = Vec::with_capacity(images.len());
        for image in images {
            match self.storage.upload(BOOK_FOLDER, image).await {
                Ok(url) => urls.push(url),
                Err(e) => {
                    error!("Image upload failed after {} of {}: {}", urls.len(), images.len(), e);
                    self.discard_images(&urls).await;
                    return Err(ServiceError::Upload(format!("Failed to upload image: {}", e)));
                }
            }
        }
        Ok(urls)
    }

    async fn ensure_unique_title(
        &self,
        title: &str,
        category: &ObjectId,
        exclude: Option<&ObjectId>,
    ) -> Result<(), ServiceError> {
        if self
            .book_repo
            .find_by_title_and_category(title, category, exclude)
            .await?
            .is_some()
        {
            warn!("Duplicate book title in category");
            return Err(ServiceError::Conflict(
                "Book with this title already exists in this category".to_string(),
            ));
        }
        Ok(())
    }

    async fn owned_book(&self, id: &str, caller: &Account) -> Result<Book, ServiceError> {
        let id = parse_object_id(id, "book")?;
        let book = self
            .book_repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Book not found".to_string()))?;

        if !caller.role.is_admin() && caller.id != Some(book.owner) {
            warn!("Caller does not own the book");
            return Err(ServiceError::Forbidden("You can only modify your own books".to_string()));
        }
        Ok(book)
    }
}

#[async_trait]
impl BookService for BookServiceImpl {
    #[instrument(skip(self, form, owner), fields(owner = %owner.id_string(), images = form.images.len()))]
    async fn create(&self, form: NewBookForm, owner: &Account) -> Result<Book, ServiceError> {
        let (title, price, description, stock, category) = match (
            required(form.title),
            required(form.price),
            required(form.description),
            required(form.stock),
            required(form.category),
        ) {
            (Some(title), Some(price), Some(description), Some(stock), Some(category)) => {
                (title, price, description, stock, category)
            }
            _ => return Err(ServiceError::Validation("All fields are required".to_string())),
        };
        let price = parse_price(&price)?;
        let stock = parse_stock(&stock)?;

        let category = resolve_category(self.category_repo.as_ref(), &category).await?;
        let category_id = category
            .id
            .ok_or_else(|| ServiceError::Internal("Category has no id".to_string()))?;

        self.ensure_unique_title(&title, &category_id, None).await?;

        let images: Vec<UploadedFile> = form.images.into_iter().filter(|f| !f.is_empty()).collect();
        if images.is_empty() {
            return Err(ServiceError::Validation("At least one image is required".to_string()));
        }
        if images.len() > MAX_BOOK_IMAGES {
            return Err(ServiceError::Validation(format!(
                "At most {} images are allowed",
                MAX_BOOK_IMAGES
            )));
        }

        let owner_id = owner
            .id
            .ok_or_else(|| ServiceError::Internal("Account has no id".to_string()))?;
        let urls = self.upload_all(&images).await?;

        let book = Book {
            id: None,
            title,
            price,
            description,
            stock,
            category: category_id,
            owner: owner_id,
            images: urls.clone(),
            created_at: None,
            updated_at: None,
        };

        match self.book_repo.insert(book).await {
            Ok(book) => {
                info!("Book created");
                Ok(book)
            }
            Err(e) => {
                error!("Failed to insert book: {}", e);
                self.discard_images(&urls).await;
                Err(e.into())
            }
        }
    }

    async fn list(&self) -> Result<Vec<BookView>, ServiceError> {
        let books = self.book_repo.list().await?;

        let category_ids: Vec<ObjectId> = books
            .iter()
            .map(|b| b.category)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let owner_ids: Vec<ObjectId> = books
            .iter()
            .map(|b| b.owner)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let categories: HashMap<ObjectId, _> = self
            .category_repo
            .find_by_ids(&category_ids)
            .await?
            .into_iter()
            .filter_map(|c| c.id.map(|id| (id, c)))
            .collect();
        let owners: HashMap<ObjectId, _> = self
            .account_repo
            .find_by_ids(&owner_ids)
            .await?
            .into_iter()
            .filter_map(|a| a.id.map(|id| (id, a)))
            .collect();

        Ok(books
            .iter()
            .map(|book| BookView::new(book, categories.get(&book.category), owners.get(&book.owner)))
            .collect())
    }

    #[instrument(skip(self, request, caller), fields(caller = %caller.id_string()))]
    async fn update(&self, id: &str, request: UpdateBookRequest, caller: &Account) -> Result<Book, ServiceError> {
        let book = self.owned_book(id, caller).await?;
        let book_id = book
            .id
            .ok_or_else(|| ServiceError::Internal("Book has no id".to_string()))?;

        let mut changes = BookChanges::default();
        if let Some(title) = request.title {
            changes.title = Some(
                required(Some(title)).ok_or_else(|| ServiceError::Validation("Title cannot be blank".to_string()))?,
            );
        }
        if let Some(price) = request.price {
            changes.price = Some(check_price(price)?);
        }
        if let Some(description) = request.description {
            changes.description = Some(
                required(Some(description))
                    .ok_or_else(|| ServiceError::Validation("Description cannot be blank".to_string()))?,
            );
        }
        changes.stock = request.stock;
        if let Some(reference) = request.category {
            let category = resolve_category(self.category_repo.as_ref(), &reference).await?;
            changes.category = category.id;
        }

        if changes.is_empty() {
            return Err(ServiceError::Validation("No fields to update".to_string()));
        }

        if changes.title.is_some() || changes.category.is_some() {
            let mut effective = book.clone();
            changes.apply_to(&mut effective);
            self.ensure_unique_title(&effective.title, &effective.category, Some(&book_id))
                .await?;
        }

        let updated = self.book_repo.update(&book_id, changes).await?;
        info!("Book updated");
        Ok(updated)
    }

    #[instrument(skip(self, caller), fields(caller = %caller.id_string()))]
    async fn delete(&self, id: &str, caller: &Account) -> Result<Book, ServiceError> {
        let book = self.owned_book(id, caller).await?;
        let book_id = book
            .id
            .ok_or_else(|| ServiceError::Internal("Book has no id".to_string()))?;

        let deleted = self.book_repo.delete(&book_id).await?;
        self.discard_images(&deleted.images).await;
        info!("Book deleted");
        Ok(deleted)
    }
}
