use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use chrono::Local;
use futures::TryStreamExt;
use mongodb::{
    options::{FindOneAndUpdateOptions, ReturnDocument},
    Collection, Database,
};
use tracing::instrument;

use crate::model::account::{Account, ProfileChanges};
use crate::repository::mongo::USERS;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn insert(&self, account: Account) -> RepositoryResult<Account>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Account>>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Account>>;
    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<Account>>;
    /// First account whose email or phone matches either value
    async fn find_by_email_or_phone(&self, email: &str, phone: &str) -> RepositoryResult<Option<Account>>;
    async fn find_by_ids(&self, ids: &[ObjectId]) -> RepositoryResult<Vec<Account>>;
    async fn set_otp(&self, id: &ObjectId, otp: &str, expires_at: i64) -> RepositoryResult<()>;
    /// Sets the verified flag and clears the OTP fields in one write.
    async fn mark_verified(&self, id: &ObjectId) -> RepositoryResult<()>;
    async fn set_refresh_token(&self, id: &ObjectId, token: Option<&str>) -> RepositoryResult<()>;
    /// Swaps the stored refresh token for `next` only while it still equals `current`.
    /// Returns false when another write got there first.
    async fn rotate_refresh_token(&self, id: &ObjectId, current: &str, next: &str) -> RepositoryResult<bool>;
    async fn set_password_hash(&self, id: &ObjectId, hash: &str) -> RepositoryResult<()>;
    async fn update_profile(&self, id: &ObjectId, changes: ProfileChanges) -> RepositoryResult<Account>;
}

pub struct AccountRepositoryImpl {
    collection: Collection<Account>,
}

impl AccountRepositoryImpl {
    pub fn new(db: &Database) -> Self {
        AccountRepositoryImpl {
            collection: db.collection::<Account>(USERS),
        }
    }

    async fn set_fields(&self, id: &ObjectId, mut fields: Document, action: &str) -> RepositoryResult<()> {
        fields.insert("updatedAt", Local::now().to_rfc3339());
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": fields }, None)
            .await
            .map_err(|e| RepositoryError::from_mongo(action, e))?;

        if result.matched_count == 0 {
            return Err(RepositoryError::not_found(format!("No account found for ID: {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for AccountRepositoryImpl {
    #[instrument(skip(self, account), fields(email = %account.email))]
    async fn insert(&self, mut account: Account) -> RepositoryResult<Account> {
        account.id = Some(ObjectId::new());
        let now = Local::now().to_rfc3339();
        account.created_at = Some(now.clone());
        account.updated_at = Some(now);
        self.collection
            .insert_one(account.clone(), None)
            .await
            .map_err(|e| RepositoryError::from_mongo("Failed to insert account", e))?;
        Ok(account)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<Account>> {
        self.collection
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find account by id: {}", e)))
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<Account>> {
        self.collection
            .find_one(doc! { "email": email }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find account by email: {}", e)))
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<Account>> {
        self.collection
            .find_one(doc! { "userName": username }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find account by username: {}", e)))
    }

    async fn find_by_email_or_phone(&self, email: &str, phone: &str) -> RepositoryResult<Option<Account>> {
        let filter = doc! { "$or": [ { "email": email }, { "phone": phone } ] };
        self.collection
            .find_one(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find account by email or phone: {}", e)))
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> RepositoryResult<Vec<Account>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Bson> = ids.iter().map(|id| Bson::ObjectId(*id)).collect();
        let cursor = self
            .collection
            .find(doc! { "_id": { "$in": ids } }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find accounts: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to read accounts: {}", e)))
    }

    #[instrument(skip(self, otp))]
    async fn set_otp(&self, id: &ObjectId, otp: &str, expires_at: i64) -> RepositoryResult<()> {
        self.set_fields(id, doc! { "otp": otp, "otpExpires": expires_at }, "Failed to store OTP")
            .await
    }

    #[instrument(skip(self))]
    async fn mark_verified(&self, id: &ObjectId) -> RepositoryResult<()> {
        let fields = doc! { "isVerified": true, "otp": Bson::Null, "otpExpires": Bson::Null };
        self.set_fields(id, fields, "Failed to verify account").await
    }

    #[instrument(skip(self, token))]
    async fn set_refresh_token(&self, id: &ObjectId, token: Option<&str>) -> RepositoryResult<()> {
        let value = token.map(|t| Bson::String(t.to_string())).unwrap_or(Bson::Null);
        self.set_fields(id, doc! { "refreshToken": value }, "Failed to store refresh token")
            .await
    }

    #[instrument(skip(self, current, next))]
    async fn rotate_refresh_token(&self, id: &ObjectId, current: &str, next: &str) -> RepositoryResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": id, "refreshToken": current },
                doc! { "$set": { "refreshToken": next, "updatedAt": Local::now().to_rfc3339() } },
                None,
            )
            .await
            .map_err(|e| RepositoryError::from_mongo("Failed to rotate refresh token", e))?;
        Ok(result.matched_count == 1)
    }

    #[instrument(skip(self, hash))]
    async fn set_password_hash(&self, id: &ObjectId, hash: &str) -> RepositoryResult<()> {
        self.set_fields(id, doc! { "password": hash }, "Failed to store password")
            .await
    }

    #[instrument(skip(self, changes))]
    async fn update_profile(&self, id: &ObjectId, changes: ProfileChanges) -> RepositoryResult<Account> {
        let mut fields = Document::new();
        if let Some(username) = changes.username {
            fields.insert("userName", username);
        }
        if let Some(email) = changes.email {
            fields.insert("email", email);
        }
        if let Some(phone) = changes.phone {
            fields.insert("phone", phone);
        }
        if let Some(address) = changes.address {
            fields.insert("address", address);
        }
        if fields.is_empty() {
            return Err(RepositoryError::validation("No profile fields to update"));
        }
        fields.insert("updatedAt", Local::now().to_rfc3339());

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": fields }, options)
            .await
            .map_err(|e| RepositoryError::from_mongo("Failed to update profile", e))?
            .ok_or_else(|| RepositoryError::not_found(format!("No account found for ID: {}", id)))
    }
}
