use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse permission tier of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Author,
    Customer,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Author => "author",
            Role::Customer => "customer",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn is_one_of(&self, allowed: &[Role]) -> bool {
        allowed.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "author" => Ok(Role::Author),
            "customer" => Ok(Role::Customer),
            "user" => Ok(Role::User),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    #[serde(rename = "userName")]
    pub username: String,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    pub avatar: String,
    pub role: Role,
    #[serde(default)]
    pub address: Option<String>,
    pub phone: String,
    /// The single refresh token currently honoured for this account
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub otp: Option<String>,
    /// Unix seconds after which `otp` is no longer accepted
    #[serde(default, rename = "otpExpires")]
    pub otp_expires_at: Option<i64>,
    #[serde(default)]
    pub is_verified: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Account {
    /// True when `code` equals the stored OTP and `now` has not passed its expiry.
    pub fn otp_matches(&self, code: &str, now: i64) -> bool {
        match (&self.otp, self.otp_expires_at) {
            (Some(stored), Some(expires_at)) => stored == code && now <= expires_at,
            _ => false,
        }
    }

    pub fn id_string(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

/// Whitelisted profile fields an account holder may change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.phone.is_none() && self.address.is_none()
    }
}
