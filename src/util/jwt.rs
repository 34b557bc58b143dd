use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::JwtConfig;

/// JWT token claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    pub email: String,
    pub username: String,
    /// admin, author, customer or user
    pub role: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Token type (access or refresh)
    pub token_type: String,
    /// JWT ID, unique per token so two pairs minted in the same second still differ
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Token pair containing access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub token_type: String,
}

/// Identity carried inside both tokens of a pair
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub username: &'a str,
    pub role: &'a str,
}

#[derive(Debug, Clone, Copy)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Error types for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to encode JWT token: {0}")]
    EncodingFailed(String),
    #[error("Failed to decode JWT token: {0}")]
    DecodingFailed(String),
    #[error("Token has expired")]
    TokenExpired,
    #[error("Invalid token format")]
    InvalidToken,
    #[error("Invalid token type: expected {expected}, got {actual}")]
    InvalidTokenType { expected: String, actual: String },
}

pub trait JwtTokenUtils {
    fn generate_access_token(&self, subject: TokenSubject<'_>) -> Result<String, JwtError>;
    fn generate_refresh_token(&self, subject: TokenSubject<'_>) -> Result<String, JwtError>;
    fn generate_token_pair(&self, subject: TokenSubject<'_>) -> Result<TokenPair, JwtError>;
    fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError>;
    fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError>;
    fn extract_token_from_header(&self, auth_header: &str) -> Result<String, JwtError>;
}

#[derive(Debug, Clone)]
pub struct JwtTokenUtilsImpl {
    pub jwt_config: JwtConfig,
}

impl JwtTokenUtilsImpl {
    pub fn new(jwt_config: JwtConfig) -> Self {
        JwtTokenUtilsImpl { jwt_config }
    }

    fn secret(&self, token_type: TokenType) -> &str {
        match token_type {
            TokenType::Access => &self.jwt_config.access_secret,
            TokenType::Refresh => &self.jwt_config.refresh_secret,
        }
    }

    fn generate_token(
        &self,
        subject: TokenSubject<'_>,
        token_type: TokenType,
        expires_in_minutes: i64,
    ) -> Result<String, JwtError> {
        debug!(
            "Generating {} token for account: {} with role: {}",
            token_type.as_str(),
            subject.id,
            subject.role
        );

        let now = Utc::now();
        let expiration = now + Duration::minutes(expires_in_minutes);

        let claims = Claims {
            sub: subject.id.to_string(),
            email: subject.email.to_string(),
            username: subject.username.to_string(),
            role: subject.role.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            token_type: token_type.as_str().to_string(),
            jti: Uuid::new_v4().to_string(),
            iss: self.jwt_config.jwt_issuer.clone(),
        };

        let header = Header::new(Algorithm::HS256);
        let encoding_key = EncodingKey::from_secret(self.secret(token_type).as_bytes());

        encode(&header, &claims, &encoding_key).map_err(|err| {
            error!("Failed to encode JWT token: {}", err);
            JwtError::EncodingFailed(err.to_string())
        })
    }

    pub fn validate_token(&self, token: &str, expected_token_type: TokenType) -> Result<Claims, JwtError> {
        debug!("Validating {} token", expected_token_type.as_str());

        let decoding_key = DecodingKey::from_secret(self.secret(expected_token_type).as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.jwt_config.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }

        let claims = match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(token_data) => token_data.claims,
            Err(err) => {
                if let jsonwebtoken::errors::ErrorKind::ExpiredSignature = err.kind() {
                    warn!("Token has expired");
                    return Err(JwtError::TokenExpired);
                }
                warn!("Failed to decode JWT token: {}", err);
                return Err(JwtError::DecodingFailed(err.to_string()));
            }
        };

        if claims.exp < Utc::now().timestamp() {
            warn!("Token has expired for account: {}", claims.sub);
            return Err(JwtError::TokenExpired);
        }

        if claims.token_type != expected_token_type.as_str() {
            warn!(
                "Invalid token type: expected {}, got {}",
                expected_token_type.as_str(),
                claims.token_type
            );
            return Err(JwtError::InvalidTokenType {
                expected: expected_token_type.as_str().to_string(),
                actual: claims.token_type,
            });
        }

        debug!("Token validation successful for account: {}", claims.sub);
        Ok(claims)
    }
}

impl JwtTokenUtils for JwtTokenUtilsImpl {
    fn generate_access_token(&self, subject: TokenSubject<'_>) -> Result<String, JwtError> {
        self.generate_token(subject, TokenType::Access, self.jwt_config.access_token_expiration)
    }

    fn generate_refresh_token(&self, subject: TokenSubject<'_>) -> Result<String, JwtError> {
        self.generate_token(subject, TokenType::Refresh, self.jwt_config.refresh_token_expiration)
    }

    fn generate_token_pair(&self, subject: TokenSubject<'_>) -> Result<TokenPair, JwtError> {
        let access_token = self.generate_access_token(subject)?;
        let refresh_token = self.generate_refresh_token(subject)?;

        info!("Generated token pair for account: {}", subject.id);
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.jwt_config.access_token_expiration * 60,
            token_type: "Bearer".to_string(),
        })
    }

    fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_token(token, TokenType::Access)
    }

    fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_token(token, TokenType::Refresh)
    }

    fn extract_token_from_header(&self, auth_header: &str) -> Result<String, JwtError> {
        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            debug!("Invalid authorization header format");
            JwtError::InvalidToken
        })?;

        let token = token.trim();
        if token.is_empty() {
            debug!("Empty token in authorization header");
            return Err(JwtError::InvalidToken);
        }

        Ok(token.to_string())
    }
}
