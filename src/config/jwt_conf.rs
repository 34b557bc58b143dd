use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

const MIN_SECRET_LEN: usize = 32;

/// JWT configuration structure
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret used to sign access tokens
    pub access_secret: String,
    /// Secret used to sign refresh tokens
    pub refresh_secret: String,
    /// Access token expiration time in minutes
    pub access_token_expiration: i64,
    /// Refresh token expiration time in minutes
    pub refresh_token_expiration: i64,
    /// JWT issuer (optional)
    pub jwt_issuer: Option<String>,
}

fn load_secret(key: &str) -> Result<String, ConfigError> {
    let secret = env::var(key).map_err(|_| {
        error!("{} environment variable not found", key);
        ConfigError::EnvVarNotFound(key.to_string())
    })?;
    debug!("{} loaded (length: {} chars)", key, secret.len());
    Ok(secret)
}

fn load_minutes(key: &str, default: i64) -> Result<i64, ConfigError> {
    env::var(key)
        .unwrap_or_else(|_| {
            warn!("{} not set, using default: {} minutes", key, default);
            default.to_string()
        })
        .parse::<i64>()
        .map_err(|e| {
            error!("Invalid {} value: {}", key, e);
            ConfigError::InvalidValue(format!("{}: {}", key, e))
        })
}

impl JwtConfig {
    /// Load JWT configuration from environment variables
    ///
    /// Expected environment variables:
    /// - JWT_ACCESS_SECRET: secret for access tokens (required, >= 32 chars)
    /// - JWT_REFRESH_SECRET: secret for refresh tokens (required, >= 32 chars)
    /// - JWT_ACCESS_TOKEN_EXPIRY: minutes, defaults to 15
    /// - JWT_REFRESH_TOKEN_EXPIRY: minutes, defaults to 14400 (10 days)
    /// - JWT_ISSUER: optional issuer claim
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading JWT configuration from environment variables");

        let config = JwtConfig {
            access_secret: load_secret("JWT_ACCESS_SECRET")?,
            refresh_secret: load_secret("JWT_REFRESH_SECRET")?,
            access_token_expiration: load_minutes("JWT_ACCESS_TOKEN_EXPIRY", 15)?,
            refresh_token_expiration: load_minutes("JWT_REFRESH_TOKEN_EXPIRY", 14400)?,
            jwt_issuer: env::var("JWT_ISSUER").ok(),
        };

        config.validate()?;
        info!("JWT configuration loaded successfully");
        Ok(config)
    }

    /// Validate the JWT configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        debug!("Validating JWT configuration");

        for (name, secret) in [("access", &self.access_secret), ("refresh", &self.refresh_secret)] {
            if secret.len() < MIN_SECRET_LEN {
                error!("JWT {} secret is too short (minimum {} characters required)", name, MIN_SECRET_LEN);
                return Err(ConfigError::ValidationError(format!(
                    "JWT {} secret must be at least {} characters long",
                    name, MIN_SECRET_LEN
                )));
            }
        }

        if self.access_secret == self.refresh_secret {
            warn!("Access and refresh tokens share the same secret");
        }

        if self.access_token_expiration <= 0 || self.refresh_token_expiration <= 0 {
            error!("Token expirations must be greater than 0");
            return Err(ConfigError::ValidationError("Token expirations must be greater than 0".to_string()));
        }

        if self.access_token_expiration >= self.refresh_token_expiration {
            warn!("Access token expiration is greater than or equal to refresh token expiration");
        }

        debug!("JWT configuration validation passed");
        Ok(())
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        JwtConfig {
            access_secret: "test_access_secret_for_jwt_testing_long_enough_for_security".to_string(),
            refresh_secret: "test_refresh_secret_for_jwt_testing_long_enough_for_security".to_string(),
            access_token_expiration: 15,
            refresh_token_expiration: 14400,
            jwt_issuer: Some("bookstore-backend-test".to_string()),
        }
    }
}
