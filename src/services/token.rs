//! Signed, time-limited bearer tokens

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::Role,
};

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject email
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    /// Unique per issued token, so two logins never share a token string
    pub jti: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Issues and validates access tokens with the configured secret and algorithm
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.header.alg)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        let algorithm: Algorithm = config
            .jwt_algorithm
            .parse()
            .map_err(|_| AppError::Internal(format!("Unknown JWT algorithm {}", config.jwt_algorithm)))?;

        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AppError::Internal(format!(
                "JWT algorithm {:?} is not an HMAC algorithm",
                algorithm
            )));
        }
        if config.jwt_secret.is_empty() {
            return Err(AppError::Internal("JWT secret must not be empty".to_string()));
        }

        let ttl = Some(config.access_token_ttl_minutes)
            .filter(|minutes| *minutes > 0)
            .and_then(Duration::try_minutes)
            .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Token lifetime must be a positive, representable number of minutes, got {}",
                    config.access_token_ttl_minutes
                ))
            })?;

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            header: Header::new(algorithm),
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token with the configured lifetime
    pub fn issue(&self, subject_email: &str, role: Role) -> AppResult<String> {
        self.issue_with_ttl(subject_email, role, self.ttl)
    }

    pub fn issue_with_ttl(&self, subject_email: &str, role: Role, ttl: Duration) -> AppResult<String> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))?;
        let claims = TokenClaims {
            sub: subject_email.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify signature, algorithm and expiry, then return the claims
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}
