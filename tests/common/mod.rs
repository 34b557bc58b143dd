#![allow(dead_code)]

use async_trait::async_trait;
use bookstore_backend::app::app::{Infrastructure, Services};
use bookstore_backend::config::{AdminUserConfig, JwtConfig, OtpConfig};
use bookstore_backend::dto::auth_dto::RegisterRequest;
use bookstore_backend::dto::file_dto::UploadedFile;
use bookstore_backend::model::account::{Account, ProfileChanges};
use bookstore_backend::model::book::{Book, BookChanges};
use bookstore_backend::model::category::Category;
use bookstore_backend::repository::account_repo::AccountRepository;
use bookstore_backend::repository::book_repo::BookRepository;
use bookstore_backend::repository::category_repo::CategoryRepository;
use bookstore_backend::repository::repository_error::{RepositoryError, RepositoryResult};
use bookstore_backend::service::auth_service::AuthService;
use bookstore_backend::util::email::{EmailError, Mailer};
use bookstore_backend::util::minio::{MinioError, ObjectStorage};
use bson::oid::ObjectId;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const PASSWORD: &str = "s3cret-pass";
pub const ADMIN_EMAIL: &str = "admin@bookstore.test";
pub const ADMIN_PASSWORD: &str = "admin-pass-123";

fn now_string() -> String {
    chrono::Utc::now().to_rfc3339()
}

// In-memory collections enforcing the same unique keys as the Mongo indexes

#[derive(Default)]
pub struct InMemoryAccounts {
    accounts: Mutex<Vec<Account>>,
    /// When set, lookups by id return this copy instead of the live record.
    snapshot: Mutex<Option<Account>>,
}

impl InMemoryAccounts {
    pub fn get_by_email(&self, email: &str) -> Option<Account> {
        self.accounts.lock().unwrap().iter().find(|a| a.email == email).cloned()
    }

    /// Freezes id lookups at the current state of the account, the view a request
    /// gets when it reads just before a concurrent write lands.
    pub fn freeze_reads(&self, email: &str) {
        *self.snapshot.lock().unwrap() = self.get_by_email(email);
    }

    /// Moves the stored OTP expiry into the past.
    pub fn expire_otp(&self, email: &str) {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(account) = accounts.iter_mut().find(|a| a.email == email) {
            account.otp_expires_at = Some(chrono::Utc::now().timestamp() - 1);
        }
    }

    fn modify<F: FnOnce(&mut Account)>(&self, id: &ObjectId, f: F) -> RepositoryResult<Account> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|a| a.id == Some(*id))
            .ok_or_else(|| RepositoryError::not_found("User not found"))?;
        f(account);
        account.updated_at = Some(now_string());
        Ok(account.clone())
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccounts {
    async fn insert(&self, mut account: Account) -> RepositoryResult<Account> {
        let mut accounts = self.accounts.lock().unwrap();
        for existing in accounts.iter() {
            if existing.email == account.email {
                return Err(RepositoryError::already_exists("email already exists"));
            }
            if existing.username == account.username {
                return Err(RepositoryError::already_exists("userName already exists"));
            }
            if existing.phone == account.phone {
                return Err(RepositoryError::already_exists("phone already exists"));
            }
        }
        account.id = Some(ObjectId::new());
        account.created_at = Some(now_string());
        account.updated_at = account.created_at.clone();
        accounts.push(account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Account>> {
        if let Some(frozen) = self.snapshot.lock().unwrap().as_ref().filter(|a| a.id == Some(*id)) {
            return Ok(Some(frozen.clone()));
        }
        Ok(self.accounts.lock().unwrap().iter().find(|a| a.id == Some(*id)).cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Account>> {
        Ok(self.get_by_email(email))
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<Account>> {
        Ok(self.accounts.lock().unwrap().iter().find(|a| a.username == username).cloned())
    }

    async fn find_by_email_or_phone(&self, email: &str, phone: &str) -> RepositoryResult<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.email == email || a.phone == phone)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> RepositoryResult<Vec<Account>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.id.is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn set_otp(&self, id: &ObjectId, otp: &str, expires_at: i64) -> RepositoryResult<()> {
        self.modify(id, |a| {
            a.otp = Some(otp.to_string());
            a.otp_expires_at = Some(expires_at);
        })
        .map(|_| ())
    }

    async fn mark_verified(&self, id: &ObjectId) -> RepositoryResult<()> {
        self.modify(id, |a| {
            a.is_verified = true;
            a.otp = None;
            a.otp_expires_at = None;
        })
        .map(|_| ())
    }

    async fn set_refresh_token(&self, id: &ObjectId, token: Option<&str>) -> RepositoryResult<()> {
        self.modify(id, |a| a.refresh_token = token.map(str::to_string)).map(|_| ())
    }

    async fn rotate_refresh_token(&self, id: &ObjectId, current: &str, next: &str) -> RepositoryResult<bool> {
        let mut accounts = self.accounts.lock().unwrap();
        match accounts
            .iter_mut()
            .find(|a| a.id == Some(*id) && a.refresh_token.as_deref() == Some(current))
        {
            Some(account) => {
                account.refresh_token = Some(next.to_string());
                account.updated_at = Some(now_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_password_hash(&self, id: &ObjectId, hash: &str) -> RepositoryResult<()> {
        self.modify(id, |a| a.password_hash = hash.to_string()).map(|_| ())
    }

    async fn update_profile(&self, id: &ObjectId, changes: ProfileChanges) -> RepositoryResult<Account> {
        {
            let accounts = self.accounts.lock().unwrap();
            let clash = accounts.iter().filter(|a| a.id != Some(*id)).any(|a| {
                changes.email.as_deref() == Some(a.email.as_str())
                    || changes.username.as_deref() == Some(a.username.as_str())
                    || changes.phone.as_deref() == Some(a.phone.as_str())
            });
            if clash {
                return Err(RepositoryError::already_exists("profile field already exists"));
            }
        }
        self.modify(id, |a| {
            if let Some(username) = changes.username {
                a.username = username;
            }
            if let Some(email) = changes.email {
                a.email = email;
            }
            if let Some(phone) = changes.phone {
                a.phone = phone;
            }
            if let Some(address) = changes.address {
                a.address = Some(address);
            }
        })
    }
}

#[derive(Default)]
pub struct InMemoryCategories {
    categories: Mutex<Vec<Category>>,
}

#[async_trait]
impl CategoryRepository for InMemoryCategories {
    async fn insert(&self, mut category: Category) -> RepositoryResult<Category> {
        let mut categories = self.categories.lock().unwrap();
        if categories.iter().any(|c| c.name == category.name) {
            return Err(RepositoryError::already_exists("name already exists"));
        }
        category.id = Some(ObjectId::new());
        category.created_at = Some(now_string());
        category.updated_at = category.created_at.clone();
        categories.push(category.clone());
        Ok(category)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Category>> {
        Ok(self.categories.lock().unwrap().iter().find(|c| c.id == Some(*id)).cloned())
    }

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Category>> {
        Ok(self.categories.lock().unwrap().iter().find(|c| c.name == name).cloned())
    }

    async fn list(&self) -> RepositoryResult<Vec<Category>> {
        let mut categories = self.categories.lock().unwrap().clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> RepositoryResult<Vec<Category>> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.id.is_some_and(|id| ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn update(&self, id: &ObjectId, name: &str, description: &str) -> RepositoryResult<Category> {
        let mut categories = self.categories.lock().unwrap();
        if categories.iter().any(|c| c.name == name && c.id != Some(*id)) {
            return Err(RepositoryError::already_exists("name already exists"));
        }
        let category = categories
            .iter_mut()
            .find(|c| c.id == Some(*id))
            .ok_or_else(|| RepositoryError::not_found("Category not found"))?;
        category.name = name.to_string();
        category.description = description.to_string();
        category.updated_at = Some(now_string());
        Ok(category.clone())
    }

    async fn delete(&self, id: &ObjectId) -> RepositoryResult<Category> {
        let mut categories = self.categories.lock().unwrap();
        let index = categories
            .iter()
            .position(|c| c.id == Some(*id))
            .ok_or_else(|| RepositoryError::not_found("Category not found"))?;
        Ok(categories.remove(index))
    }
}

#[derive(Default)]
pub struct InMemoryBooks {
    books: Mutex<Vec<Book>>,
}

impl InMemoryBooks {
    pub fn count(&self) -> usize {
        self.books.lock().unwrap().len()
    }
}

#[async_trait]
impl BookRepository for InMemoryBooks {
    async fn insert(&self, mut book: Book) -> RepositoryResult<Book> {
        let mut books = self.books.lock().unwrap();
        if books.iter().any(|b| b.title == book.title && b.category == book.category) {
            return Err(RepositoryError::already_exists("title already exists"));
        }
        book.id = Some(ObjectId::new());
        book.created_at = Some(now_string());
        book.updated_at = book.created_at.clone();
        books.push(book.clone());
        Ok(book)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Book>> {
        Ok(self.books.lock().unwrap().iter().find(|b| b.id == Some(*id)).cloned())
    }

    async fn find_by_title_and_category(
        &self,
        title: &str,
        category: &ObjectId,
        exclude: Option<&ObjectId>,
    ) -> RepositoryResult<Option<Book>> {
        Ok(self
            .books
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.title == title && b.category == *category && b.id.as_ref() != exclude)
            .cloned())
    }

    async fn list(&self) -> RepositoryResult<Vec<Book>> {
        let mut books = self.books.lock().unwrap().clone();
        books.reverse();
        Ok(books)
    }

    async fn update(&self, id: &ObjectId, changes: BookChanges) -> RepositoryResult<Book> {
        let mut books = self.books.lock().unwrap();
        let book = books
            .iter_mut()
            .find(|b| b.id == Some(*id))
            .ok_or_else(|| RepositoryError::not_found("Book not found"))?;
        changes.apply_to(book);
        book.updated_at = Some(now_string());
        Ok(book.clone())
    }

    async fn delete(&self, id: &ObjectId) -> RepositoryResult<Book> {
        let mut books = self.books.lock().unwrap();
        let index = books
            .iter()
            .position(|b| b.id == Some(*id))
            .ok_or_else(|| RepositoryError::not_found("Book not found"))?;
        Ok(books.remove(index))
    }
}

/// Captures every OTP mail instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl RecordingMailer {
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_otp_email(&self, to: &str, _username: &str, code: &str, _ttl_minutes: i64) -> Result<(), EmailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmailError::SmtpError("mailbox unavailable".to_string()));
        }
        self.sent.lock().unwrap().push((to.to_string(), code.to_string()));
        Ok(())
    }
}

/// Object storage double; `fail_on_nth` makes the n-th upload (1-based) fail.
#[derive(Default)]
pub struct FakeStorage {
    pub fail_on_nth: Option<usize>,
    calls: AtomicUsize,
    stored: Mutex<Vec<String>>,
    removed: Mutex<Vec<String>>,
}

impl FakeStorage {
    pub fn failing_on(nth: usize) -> Self {
        FakeStorage {
            fail_on_nth: Some(nth),
            ..Default::default()
        }
    }

    pub fn stored(&self) -> Vec<String> {
        self.stored.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(&self, folder: &str, file: &UploadedFile) -> Result<String, MinioError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_nth == Some(call) {
            return Err(MinioError::OperationError("disk full".to_string()));
        }
        let url = format!("http://storage.test/bookstore/{}/{}-{}", folder, call, file.filename);
        self.stored.lock().unwrap().push(url.clone());
        Ok(url)
    }

    async fn remove(&self, url: &str) -> Result<(), MinioError> {
        self.stored.lock().unwrap().retain(|u| u != url);
        self.removed.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub struct TestHarness {
    pub accounts: Arc<InMemoryAccounts>,
    pub categories: Arc<InMemoryCategories>,
    pub books: Arc<InMemoryBooks>,
    pub mailer: Arc<RecordingMailer>,
    pub storage: Arc<FakeStorage>,
    pub services: Services,
}

pub fn harness() -> TestHarness {
    harness_with_storage(FakeStorage::default())
}

pub fn harness_with_storage(storage: FakeStorage) -> TestHarness {
    let accounts = Arc::new(InMemoryAccounts::default());
    let categories = Arc::new(InMemoryCategories::default());
    let books = Arc::new(InMemoryBooks::default());
    let mailer = Arc::new(RecordingMailer::default());
    let storage = Arc::new(storage);

    let services = Services::assemble(
        Infrastructure {
            accounts: accounts.clone(),
            categories: categories.clone(),
            books: books.clone(),
            mailer: mailer.clone(),
            storage: storage.clone(),
        },
        JwtConfig::default(),
        OtpConfig::default(),
    )
    .expect("default test configuration is valid");

    TestHarness {
        accounts,
        categories,
        books,
        mailer,
        storage,
        services,
    }
}

pub fn image(name: &str) -> UploadedFile {
    UploadedFile {
        filename: name.to_string(),
        content_type: "image/png".to_string(),
        content: Bytes::from_static(b"\x89PNG\r\n\x1a\nfake"),
    }
}

pub fn registration(username: &str, email: &str, phone: &str, role: Option<&str>) -> RegisterRequest {
    RegisterRequest {
        user_name: username.to_string(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
        phone: phone.to_string(),
        role: role.map(str::to_string),
        address: None,
    }
}

impl TestHarness {
    /// Registers, verifies with the mailed code and returns the stored account.
    pub async fn verified_account(&self, username: &str, email: &str, phone: &str, role: &str) -> Account {
        let auth = &self.services.auth_service;
        auth.register(registration(username, email, phone, Some(role)), Some(image("avatar.png")))
            .await
            .expect("registration should succeed");
        let code = self.mailer.last_code_for(email).expect("an OTP mail");
        auth.verify_otp(email, &code).await.expect("verification should succeed");
        self.accounts.get_by_email(email).expect("stored account")
    }

    pub async fn admin(&self) -> Account {
        let admin = AdminUserConfig {
            username: "admin".to_string(),
            email: ADMIN_EMAIL.to_string(),
            phone: "0000000000".to_string(),
            password: ADMIN_PASSWORD.to_string(),
        };
        self.services.auth_service.ensure_admin(&admin).await.expect("admin seed");
        self.accounts.get_by_email(ADMIN_EMAIL).expect("stored admin")
    }
}
