use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// Object storage settings for avatars and book images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinioConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket_name: String,
    /// Public base URL that uploaded objects are served from
    pub links_prefix: String,
    pub secure: bool,
}

impl MinioConfig {
    /// Load MinIO configuration from environment variables
    ///
    /// - MINIO_ENDPOINT, MINIO_ACCESS_KEY, MINIO_SECRET_KEY, MINIO_BUCKET_NAME (required)
    /// - MINIO_LINKS_PREFIX: public base URL (defaults to the endpoint URL)
    /// - MINIO_SECURE: whether to use HTTPS (defaults to false)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading MinIO configuration from environment variables");

        let var = |key: &str| {
            env::var(key).map_err(|_| {
                error!("{} environment variable not found", key);
                ConfigError::EnvVarNotFound(key.to_string())
            })
        };

        let endpoint = var("MINIO_ENDPOINT")?;
        let access_key = var("MINIO_ACCESS_KEY")?;
        let secret_key = var("MINIO_SECRET_KEY")?;
        let bucket_name = var("MINIO_BUCKET_NAME")?;
        debug!("MinIO endpoint: {}, bucket: {}", endpoint, bucket_name);

        let secure = env::var("MINIO_SECURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| {
                warn!("MINIO_SECURE not set or invalid, defaulting to false (HTTP)");
                false
            });

        let mut config = Self {
            endpoint,
            access_key,
            secret_key,
            bucket_name,
            links_prefix: String::new(),
            secure,
        };
        config.links_prefix = env::var("MINIO_LINKS_PREFIX").unwrap_or_else(|_| {
            warn!("MINIO_LINKS_PREFIX not set, serving links from the endpoint");
            config.get_endpoint_url()
        });

        config.validate()?;
        info!("MinIO configuration loaded successfully");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::ValidationError("Endpoint cannot be empty".to_string()));
        }

        if self.access_key.is_empty() || self.secret_key.is_empty() {
            return Err(ConfigError::ValidationError("Access and secret keys cannot be empty".to_string()));
        }

        // S3 bucket naming rules, simplified
        if !self.bucket_name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.') {
            error!("Invalid bucket name format: {}", self.bucket_name);
            return Err(ConfigError::ValidationError("Bucket name contains invalid characters".to_string()));
        }

        if self.bucket_name.len() < 3 || self.bucket_name.len() > 63 {
            return Err(ConfigError::ValidationError(
                "Bucket name must be between 3 and 63 characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full endpoint URL with protocol
    pub fn get_endpoint_url(&self) -> String {
        let protocol = if self.secure { "https" } else { "http" };
        format!("{}://{}", protocol, self.endpoint)
    }
}

impl Default for MinioConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost:9000".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket_name: "bookstore".to_string(),
            links_prefix: "http://localhost:9000".to_string(),
            secure: false,
        }
    }
}
