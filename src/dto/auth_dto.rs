use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use crate::model::account::{Account, ProfileChanges, Role};

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("Phone number must be exactly 10 digits".into());
        Err(err)
    }
}

/// Registration form, read from the multipart text fields.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    /// Defaults to `user` when absent
    pub role: Option<String>,
    pub address: Option<String>,
}

impl RegisterRequest {
    /// Names of required fields that are missing or only whitespace.
    pub fn blank_fields(&self) -> Vec<&'static str> {
        let mut blank = Vec::new();
        for (name, value) in [
            ("userName", Some(&self.user_name)),
            ("email", Some(&self.email)),
            ("password", Some(&self.password)),
            ("phone", Some(&self.phone)),
            ("role", self.role.as_ref()),
        ] {
            if value.is_some_and(|v| v.trim().is_empty()) {
                blank.push(name);
            }
        }
        blank
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "OTP is required"))]
    pub otp: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResendOtpRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub password: String,
}

/// How a login names its account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    Email(String),
    Username(String),
}

impl LoginRequest {
    pub fn identifier(&self) -> Option<LoginIdentifier> {
        let non_blank = |v: &Option<String>| v.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
        non_blank(&self.email)
            .map(LoginIdentifier::Email)
            .or_else(|| non_blank(&self.user_name).map(LoginIdentifier::Username))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Picks the editable profile fields out of an arbitrary JSON object.
/// Unknown keys, non-string values and blank strings are ignored.
pub fn profile_changes_from(body: &Map<String, Value>) -> ProfileChanges {
    let field = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    ProfileChanges {
        username: field("userName"),
        email: field("email"),
        phone: field("phone"),
        address: field("address"),
    }
}

/// Account as shown to clients: no password hash, refresh token or OTP state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_name: String,
    pub email: String,
    pub avatar: String,
    pub role: Role,
    pub address: Option<String>,
    pub phone: String,
    pub is_verified: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        AccountResponse {
            id: account.id_string(),
            user_name: account.username.clone(),
            email: account.email.clone(),
            avatar: account.avatar.clone(),
            role: account.role,
            address: account.address.clone(),
            phone: account.phone.clone(),
            is_verified: account.is_verified,
            created_at: account.created_at.clone(),
            updated_at: account.updated_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredResponse {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: AccountResponse,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}
