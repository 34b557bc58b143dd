use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// Configuration for the email verification one-time codes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    /// Number of decimal digits in a code
    pub length: u32,
    /// Lifetime of a code in seconds
    pub ttl_secs: i64,
}

impl OtpConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading OTP configuration from environment variables");

        let length = env::var("OTP_LENGTH")
            .unwrap_or_else(|_| {
                warn!("OTP_LENGTH not set, defaulting to 6 digits");
                "6".to_string()
            })
            .parse::<u32>()
            .map_err(|_| {
                error!("Invalid OTP_LENGTH value");
                ConfigError::InvalidValue("Invalid OTP_LENGTH value".to_string())
            })?;

        let ttl_secs = env::var("OTP_TTL_SECS")
            .unwrap_or_else(|_| {
                warn!("OTP_TTL_SECS not set, defaulting to 300 seconds");
                "300".to_string()
            })
            .parse::<i64>()
            .map_err(|_| {
                error!("Invalid OTP_TTL_SECS value");
                ConfigError::InvalidValue("Invalid OTP_TTL_SECS value".to_string())
            })?;
        debug!(length, ttl_secs, "OTP settings");

        let config = OtpConfig { length, ttl_secs };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(4..=9).contains(&self.length) {
            return Err(ConfigError::ValidationError("OTP length must be between 4 and 9 digits".to_string()));
        }
        if self.ttl_secs <= 0 {
            return Err(ConfigError::ValidationError("OTP TTL must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// TTL rounded up to whole minutes, as shown to the user
    pub fn ttl_minutes(&self) -> i64 {
        (self.ttl_secs + 59) / 60
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        OtpConfig { length: 6, ttl_secs: 300 }
    }
}
