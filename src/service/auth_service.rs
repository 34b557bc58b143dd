use async_trait::async_trait;
use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::config::{AdminUserConfig, ConfigError, OtpConfig};
use crate::dto::auth_dto::{LoginIdentifier, LoginRequest, RegisterRequest};
use crate::dto::file_dto::UploadedFile;
use crate::model::account::{Account, ProfileChanges, Role};
use crate::repository::account_repo::AccountRepository;
use crate::util::email::Mailer;
use crate::util::error::ServiceError;
use crate::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl, TokenPair, TokenSubject};
use crate::util::minio::ObjectStorage;
use crate::util::otp::OtpGenerator;
use crate::util::password::{PasswordUtils, PasswordUtilsImpl};

pub const AVATAR_FOLDER: &str = "avatars";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpOutcome {
    Verified,
    AlreadyVerified,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub account: Account,
    pub tokens: TokenPair,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an unverified account and emails it a one-time code.
    async fn register(&self, request: RegisterRequest, avatar: Option<UploadedFile>) -> Result<Account, ServiceError>;
    async fn verify_otp(&self, email: &str, code: &str) -> Result<OtpOutcome, ServiceError>;
    async fn resend_otp(&self, email: &str) -> Result<(), ServiceError>;
    async fn login(&self, request: LoginRequest) -> Result<LoginResult, ServiceError>;
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenPair, ServiceError>;
    async fn logout(&self, account_id: &ObjectId) -> Result<(), ServiceError>;
    async fn change_password(&self, account_id: &ObjectId, old_password: &str, new_password: &str) -> Result<(), ServiceError>;
    async fn update_profile(&self, account_id: &ObjectId, changes: ProfileChanges) -> Result<Account, ServiceError>;
    /// Loads the account an access token's subject refers to.
    async fn current_account(&self, subject: &str) -> Result<Account, ServiceError>;
    /// Creates the configured admin account unless its email is already taken.
    async fn ensure_admin(&self, admin: &AdminUserConfig) -> Result<bool, ServiceError>;
}

pub struct AuthServiceImpl {
    pub account_repo: Arc<dyn AccountRepository>,
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
    pub mailer: Arc<dyn Mailer>,
    pub storage: Arc<dyn ObjectStorage>,
    otp: OtpGenerator,
}

impl AuthServiceImpl {
    pub fn new(
        account_repo: Arc<dyn AccountRepository>,
        jwt_utils: Arc<JwtTokenUtilsImpl>,
        mailer: Arc<dyn Mailer>,
        storage: Arc<dyn ObjectStorage>,
        otp_config: OtpConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            account_repo,
            jwt_utils,
            mailer,
            storage,
            otp: OtpGenerator::new(otp_config)?,
        })
    }

    fn issue_tokens(&self, account: &Account) -> Result<TokenPair, ServiceError> {
        let id = account.id_string();
        let subject = TokenSubject {
            id: &id,
            email: &account.email,
            username: &account.username,
            role: account.role.as_str(),
        };
        self.jwt_utils
            .generate_token_pair(subject)
            .map_err(|e| ServiceError::Internal(format!("JWT error: {}", e)))
    }

    /// Mints a pair and makes its refresh token the only one honoured for the account.
    async fn start_session(&self, account: &Account) -> Result<TokenPair, ServiceError> {
        let account_id = account
            .id
            .ok_or_else(|| ServiceError::Internal("Account has no id".to_string()))?;
        let tokens = self.issue_tokens(account)?;
        self.account_repo
            .set_refresh_token(&account_id, Some(&tokens.refresh_token))
            .await?;
        Ok(tokens)
    }

    async fn send_otp(&self, account: &Account, code: &str) -> Result<(), ServiceError> {
        self.mailer
            .send_otp_email(&account.email, &account.username, code, self.otp.ttl_minutes())
            .await
            .map_err(|e| {
                error!("Failed to send OTP email: {}", e);
                ServiceError::Internal("Failed to send verification email".to_string())
            })
    }

    fn hash(password: &str) -> Result<String, ServiceError> {
        PasswordUtilsImpl::hash_password(password)
            .map_err(|e| ServiceError::Internal(format!("Password hash error: {}", e)))
    }

    fn password_matches(password: &str, hash: &str) -> Result<bool, ServiceError> {
        PasswordUtilsImpl::verify_password(password, hash)
            .map_err(|e| ServiceError::Internal(format!("Password verify error: {}", e)))
    }

    async fn find_required(&self, id: &ObjectId) -> Result<Account, ServiceError> {
        self.account_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    #[instrument(skip(self, request, avatar), fields(email = %request.email, username = %request.user_name))]
    async fn register(&self, request: RegisterRequest, avatar: Option<UploadedFile>) -> Result<Account, ServiceError> {
        let blank = request.blank_fields();
        if !blank.is_empty() {
            return Err(ServiceError::Validation(format!("All fields are required: {}", blank.join(", "))));
        }
        request
            .validate()
            .map_err(|e| ServiceError::Validation(format!("Validation error: {}", e)))?;

        let role = match request.role.as_deref() {
            Some(role) => role.parse::<Role>().map_err(ServiceError::Validation)?,
            None => Role::default(),
        };
        if role.is_admin() {
            warn!("Rejected self-registration as admin");
            return Err(ServiceError::Validation("Cannot register as admin".to_string()));
        }

        let email = request.email.trim().to_lowercase();
        let username = request.user_name.trim().to_string();
        let phone = request.phone.trim().to_string();

        if self.account_repo.find_by_email_or_phone(&email, &phone).await?.is_some() {
            return Err(ServiceError::Conflict("User with email or phone already exists".to_string()));
        }
        if self.account_repo.find_by_username(&username).await?.is_some() {
            return Err(ServiceError::Conflict("Username is already taken".to_string()));
        }

        let avatar = avatar
            .filter(|file| !file.is_empty())
            .ok_or_else(|| ServiceError::Validation("Avatar file is required".to_string()))?;

        let password_hash = Self::hash(&request.password)?;

        let avatar_url = self.storage.upload(AVATAR_FOLDER, &avatar).await.map_err(|e| {
            error!("Avatar upload failed: {}", e);
            ServiceError::Upload(format!("Failed to upload avatar: {}", e))
        })?;

        let otp = self.otp.issue();
        let account = Account {
            id: None,
            username,
            email,
            password_hash,
            avatar: avatar_url.clone(),
            role,
            address: request.address.map(|a| a.trim().to_string()).filter(|a| !a.is_empty()),
            phone,
            refresh_token: None,
            otp: Some(otp.code.clone()),
            otp_expires_at: Some(otp.expires_at),
            is_verified: false,
            created_at: None,
            updated_at: None,
        };

        let inserted = match self.account_repo.insert(account).await {
            Ok(account) => account,
            Err(e) => {
                error!("Failed to insert account: {}", e);
                if let Err(remove_err) = self.storage.remove(&avatar_url).await {
                    warn!("Failed to remove orphaned avatar {}: {}", avatar_url, remove_err);
                }
                return Err(e.into());
            }
        };
        info!("Account registered, awaiting verification");

        self.send_otp(&inserted, &otp.code).await?;
        Ok(inserted)
    }

    #[instrument(skip(self, code))]
    async fn verify_otp(&self, email: &str, code: &str) -> Result<OtpOutcome, ServiceError> {
        let account = self
            .account_repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        if account.is_verified {
            info!("Account already verified");
            return Ok(OtpOutcome::AlreadyVerified);
        }

        let now = chrono::Utc::now().timestamp();
        if !account.otp_matches(code.trim(), now) {
            warn!("Invalid or expired OTP");
            return Err(ServiceError::InvalidOtp("Invalid or expired OTP".to_string()));
        }

        let account_id = account
            .id
            .ok_or_else(|| ServiceError::Internal("Account has no id".to_string()))?;
        self.account_repo.mark_verified(&account_id).await?;
        info!("Account verified");
        Ok(OtpOutcome::Verified)
    }

    #[instrument(skip(self))]
    async fn resend_otp(&self, email: &str) -> Result<(), ServiceError> {
        let account = self
            .account_repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        if account.is_verified {
            return Err(ServiceError::Validation("Account already verified".to_string()));
        }

        let account_id = account
            .id
            .ok_or_else(|| ServiceError::Internal("Account has no id".to_string()))?;
        let otp = self.otp.issue();
        self.account_repo.set_otp(&account_id, &otp.code, otp.expires_at).await?;
        self.send_otp(&account, &otp.code).await?;
        info!("OTP re-issued");
        Ok(())
    }

    #[instrument(skip(self, request))]
    async fn login(&self, request: LoginRequest) -> Result<LoginResult, ServiceError> {
        let identifier = request
            .identifier()
            .ok_or_else(|| ServiceError::Validation("Email or username is required".to_string()))?;
        if request.password.is_empty() {
            return Err(ServiceError::Validation("Password is required".to_string()));
        }

        let found = match &identifier {
            LoginIdentifier::Email(email) => self.account_repo.find_by_email(&email.to_lowercase()).await,
            LoginIdentifier::Username(username) => self.account_repo.find_by_username(username).await,
        };
        let account = found?.ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        if !account.is_verified {
            warn!("Login attempt on unverified account");
            return Err(ServiceError::Forbidden("Please verify your email before logging in".to_string()));
        }

        if !Self::password_matches(&request.password, &account.password_hash)? {
            warn!("Invalid credentials");
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }

        let tokens = self.start_session(&account).await?;
        info!(account_id = %account.id_string(), "Logged in");
        Ok(LoginResult { account, tokens })
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenPair, ServiceError> {
        let claims = self.jwt_utils.validate_refresh_token(refresh_token).map_err(|e| {
            warn!("Refresh token rejected: {}", e);
            ServiceError::Unauthorized("Invalid refresh token".to_string())
        })?;

        let account_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid refresh token".to_string()))?;
        let account = self
            .account_repo
            .find_by_id(&account_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid refresh token".to_string()))?;

        if account.refresh_token.as_deref() != Some(refresh_token) {
            warn!("Refresh token is stale or was revoked");
            return Err(ServiceError::Unauthorized("Refresh token is expired or used".to_string()));
        }

        let tokens = self.issue_tokens(&account)?;
        let rotated = self
            .account_repo
            .rotate_refresh_token(&account_id, refresh_token, &tokens.refresh_token)
            .await?;
        if !rotated {
            warn!("Refresh token was rotated concurrently");
            return Err(ServiceError::Unauthorized("Refresh token is expired or used".to_string()));
        }
        info!("Refresh token rotated");
        Ok(tokens)
    }

    #[instrument(skip(self))]
    async fn logout(&self, account_id: &ObjectId) -> Result<(), ServiceError> {
        self.account_repo.set_refresh_token(account_id, None).await?;
        info!("Logged out");
        Ok(())
    }

    #[instrument(skip(self, old_password, new_password))]
    async fn change_password(&self, account_id: &ObjectId, old_password: &str, new_password: &str) -> Result<(), ServiceError> {
        if old_password.is_empty() || new_password.trim().is_empty() {
            return Err(ServiceError::Validation("Old and new passwords are required".to_string()));
        }

        let account = self.find_required(account_id).await?;
        if !Self::password_matches(old_password, &account.password_hash)? {
            warn!("Old password mismatch");
            return Err(ServiceError::Unauthorized("Invalid old password".to_string()));
        }

        let hash = Self::hash(new_password)?;
        self.account_repo.set_password_hash(account_id, &hash).await?;
        info!("Password changed");
        Ok(())
    }

    #[instrument(skip(self, changes))]
    async fn update_profile(&self, account_id: &ObjectId, mut changes: ProfileChanges) -> Result<Account, ServiceError> {
        if changes.is_empty() {
            return Err(ServiceError::Validation("No valid fields to update".to_string()));
        }
        if let Some(email) = changes.email.take() {
            let email = email.to_lowercase();
            if !validator::ValidateEmail::validate_email(&email) {
                return Err(ServiceError::Validation("Invalid email address".to_string()));
            }
            changes.email = Some(email);
        }
        if let Some(phone) = &changes.phone {
            crate::dto::auth_dto::validate_phone(phone)
                .map_err(|_| ServiceError::Validation("Phone number must be exactly 10 digits".to_string()))?;
        }

        let updated = self.account_repo.update_profile(account_id, changes).await;
        match &updated {
            Ok(_) => info!("Profile updated"),
            Err(e) => error!("Failed to update profile: {}", e),
        }
        Ok(updated?)
    }

    async fn current_account(&self, subject: &str) -> Result<Account, ServiceError> {
        let id = ObjectId::parse_str(subject)
            .map_err(|_| ServiceError::Unauthorized("Invalid access token".to_string()))?;
        self.account_repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid access token".to_string()))
    }

    #[instrument(skip(self, admin), fields(email = %admin.email))]
    async fn ensure_admin(&self, admin: &AdminUserConfig) -> Result<bool, ServiceError> {
        let email = admin.email.trim().to_lowercase();
        if self.account_repo.find_by_email(&email).await?.is_some() {
            info!("Admin account already exists, skipping creation");
            return Ok(false);
        }

        let account = Account {
            id: None,
            username: admin.username.clone(),
            email,
            password_hash: Self::hash(&admin.password)?,
            avatar: String::new(),
            role: Role::Admin,
            address: None,
            phone: admin.phone.clone(),
            refresh_token: None,
            otp: None,
            otp_expires_at: None,
            is_verified: true,
            created_at: None,
            updated_at: None,
        };
        self.account_repo.insert(account).await?;
        info!("Admin account created");
        Ok(true)
    }
}
