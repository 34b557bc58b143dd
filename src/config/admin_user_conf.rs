use std::env;
use serde::{Serialize, Deserialize};
use crate::config::ConfigError;

/// Credentials of the admin account seeded at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserConfig {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

fn required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::EnvVarNotFound(key.to_string()))
}

impl AdminUserConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(AdminUserConfig {
            username: required("ADMIN_USERNAME")?,
            email: required("ADMIN_EMAIL")?,
            phone: required("ADMIN_PHONE")?,
            password: required("ADMIN_PASSWORD")?,
        })
    }
}
