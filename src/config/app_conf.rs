use std::env;
use tracing::{debug, warn};

use crate::config::ConfigError;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Versioned prefix every API route is nested under
    pub api_prefix: String,
    pub cors_origin: String,
    /// Whether auth cookies carry the Secure attribute
    pub cookie_secure: bool,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_port(env::var("APP_PORT").ok())?;

        let api_prefix = env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string());

        let cors_origin = env::var("CORS_ORIGIN").unwrap_or_else(|_| {
            warn!("CORS_ORIGIN not set, defaulting to http://localhost:3000");
            "http://localhost:3000".to_string()
        });

        let cookie_secure = env::var("COOKIE_SECURE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidValue("Invalid MAX_UPLOAD_BYTES value".to_string()))?;

        debug!(host = %host, port, api_prefix = %api_prefix, "Application config loaded");

        let config = AppConfig { host, port, api_prefix, cors_origin, cookie_secure, max_upload_bytes };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.api_prefix.starts_with('/') || self.api_prefix.ends_with('/') {
            return Err(ConfigError::ValidationError(
                "API_PREFIX must start with / and must not end with /".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::ValidationError("MAX_UPLOAD_BYTES must be greater than 0".to_string()));
        }
        Ok(())
    }
}

fn parse_port(raw: Option<String>) -> Result<u16, ConfigError> {
    match raw {
        None => Ok(8080),
        Some(value) => value
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue(format!("Invalid APP_PORT value: {}", value))),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_prefix: "/api/v1".to_string(),
            cors_origin: "http://localhost:3000".to_string(),
            cookie_secure: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.api_prefix, "/api/v1");
        assert!(config.cookie_secure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_trailing_slash_prefix() {
        let mut config = AppConfig::default();
        config.api_prefix = "/api/v1/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_upload_limit() {
        let mut config = AppConfig::default();
        config.max_upload_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_port_defaults_and_rejects_garbage() {
        assert_eq!(parse_port(None).unwrap(), 8080);
        assert_eq!(parse_port(Some("3000".to_string())).unwrap(), 3000);
        assert!(matches!(parse_port(Some("80a".to_string())), Err(ConfigError::InvalidValue(_))));
        assert!(parse_port(Some("70000".to_string())).is_err());
    }
}
