use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// Email configuration for SMTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    /// Whether to use TLS at all
    pub use_tls: bool,
    /// STARTTLS upgrade instead of implicit TLS
    pub use_starttls: bool,
    pub from_email: String,
    /// Display name on outgoing mail
    pub from_name: String,
    pub connection_timeout_secs: u64,
}

fn required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| {
        error!("{} environment variable not found", key);
        ConfigError::EnvVarNotFound(key.to_string())
    })
}

fn flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => value.parse::<bool>().unwrap_or_else(|_| {
            warn!("Invalid {} value '{}', defaulting to {}", key, value, default);
            default
        }),
        Err(_) => default,
    }
}

impl EmailConfig {
    /// Create EmailConfig from environment variables
    ///
    /// SMTP_HOST, SMTP_USERNAME, SMTP_PASSWORD and SMTP_FROM_EMAIL are required.
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading email configuration from environment variables");

        let smtp_host = required("SMTP_HOST")?;
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| {
                warn!("SMTP_PORT not set, defaulting to 587");
                "587".to_string()
            })
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("Invalid SMTP_PORT value".to_string()))?;
        debug!("SMTP server: {}:{}", smtp_host, smtp_port);

        let smtp_username = required("SMTP_USERNAME")?;
        let smtp_password = required("SMTP_PASSWORD")?;
        let from_email = required("SMTP_FROM_EMAIL")?;
        let from_name = env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Bookstore".to_string());

        let connection_timeout_secs = env::var("SMTP_CONNECTION_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let config = EmailConfig {
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            use_tls: flag("SMTP_USE_TLS", true),
            use_starttls: flag("SMTP_USE_STARTTLS", true),
            from_email,
            from_name,
            connection_timeout_secs,
        };

        config.validate()?;
        info!("Email configuration loaded successfully");
        Ok(config)
    }

    /// Local mail catcher settings (e.g. MailHog on 1025)
    pub fn from_test_env() -> Self {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_username: "test".to_string(),
            smtp_password: "test".to_string(),
            use_tls: false,
            use_starttls: false,
            from_email: "test@example.com".to_string(),
            from_name: "Bookstore Test".to_string(),
            connection_timeout_secs: 10,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smtp_host.is_empty() {
            return Err(ConfigError::ValidationError("SMTP host cannot be empty".to_string()));
        }

        if self.smtp_port == 0 {
            return Err(ConfigError::ValidationError("SMTP port cannot be 0".to_string()));
        }

        if self.smtp_username.is_empty() || self.smtp_password.is_empty() {
            return Err(ConfigError::ValidationError("SMTP credentials cannot be empty".to_string()));
        }

        if !self.from_email.contains('@') {
            error!("Invalid from email format");
            return Err(ConfigError::ValidationError("Invalid from email format".to_string()));
        }

        if self.connection_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("Connection timeout cannot be 0".to_string()));
        }

        Ok(())
    }
}
