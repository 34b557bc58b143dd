use rand::Rng;
use tracing::debug;

use crate::config::{ConfigError, OtpConfig};

/// A freshly issued verification code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedOtp {
    pub code: String,
    /// Unix seconds
    pub expires_at: i64,
}

impl IssuedOtp {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// Issues numeric one-time codes with a fixed lifetime.
#[derive(Debug, Clone)]
pub struct OtpGenerator {
    config: OtpConfig,
}

impl OtpGenerator {
    pub fn new(config: OtpConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(OtpGenerator { config })
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.config.ttl_minutes()
    }

    pub fn issue(&self) -> IssuedOtp {
        self.issue_at(chrono::Utc::now().timestamp())
    }

    pub fn issue_at(&self, now: i64) -> IssuedOtp {
        let code = generate_code(self.config.length);
        debug!("Issued {}-digit OTP valid for {} seconds", self.config.length, self.config.ttl_secs);
        IssuedOtp {
            code,
            expires_at: now + self.config.ttl_secs,
        }
    }
}

/// Uniform over every `length`-digit string, leading zeros included.
fn generate_code(length: u32) -> String {
    let upper = 10u64.pow(length);
    let value = rand::thread_rng().gen_range(0..upper);
    format!("{:0width$}", value, width = length as usize)
}
