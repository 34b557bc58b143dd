pub mod admin_user_conf;
pub mod app_conf;
pub mod email_conf;
pub mod jwt_conf;
pub mod minio_conf;
pub mod mongo_conf;
pub mod otp_conf;

pub use admin_user_conf::AdminUserConfig;
pub use app_conf::AppConfig;
pub use email_conf::EmailConfig;
pub use jwt_conf::JwtConfig;
pub use minio_conf::MinioConfig;
pub use mongo_conf::MongoConfig;
pub use otp_conf::OtpConfig;

use tracing::{info, warn};

/// Common configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Every configuration section the process needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app: AppConfig,
    pub mongo: MongoConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub minio: MinioConfig,
    pub otp: OtpConfig,
    /// Seed admin account, only present when all ADMIN_* variables are set
    pub admin: Option<AdminUserConfig>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading application settings");

        let admin = match AdminUserConfig::from_env() {
            Ok(admin) => Some(admin),
            Err(e) => {
                warn!("Admin seed account disabled: {}", e);
                None
            }
        };

        Ok(Settings {
            app: AppConfig::from_env()?,
            mongo: MongoConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            email: EmailConfig::from_env()?,
            minio: MinioConfig::from_env()?,
            otp: OtpConfig::from_env()?,
            admin,
        })
    }
}
