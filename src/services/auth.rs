//! Login, logout and request authentication

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::User,
    repository::Repository,
};

use super::{credentials, revocation::RevocationLedger, token::TokenService};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    tokens: TokenService,
    ledger: RevocationLedger,
}

impl AuthService {
    pub fn new(repository: Repository, config: &AuthConfig) -> AppResult<Self> {
        Ok(Self {
            ledger: RevocationLedger::new(repository.revoked_tokens.clone()),
            tokens: TokenService::new(config)?,
            repository,
        })
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn ledger(&self) -> &RevocationLedger {
        &self.ledger
    }

    /// Check credentials and issue a fresh access token.
    /// Clears the user's revocation ledger entries.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<String> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !credentials::verify_password(password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user.email, user.role)?;

        let purged = self.ledger.purge_for_user(user.id).await?;
        tracing::info!(user_id = user.id, purged, "User logged in");

        Ok(token)
    }

    /// Revoke the presented token on behalf of its owner
    pub async fn logout(&self, token: &str, user: &User) -> AppResult<()> {
        self.ledger.revoke(token, user.id).await?;
        tracing::info!(user_id = user.id, "User logged out");
        Ok(())
    }

    /// Resolve a bearer token to its user.
    ///
    /// The ledger is consulted before the signature so a revoked token is
    /// refused even while it is still cryptographically valid.
    pub async fn authenticate(&self, token: &str) -> AppResult<User> {
        if self.ledger.is_revoked(token).await? {
            return Err(AppError::Unauthorized("Token has been revoked".to_string()));
        }

        let claims = self.tokens.decode(token).map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            AppError::Unauthorized("Could not validate credentials".to_string())
        })?;

        self.repository
            .users
            .get_by_email(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Could not validate credentials".to_string()))
    }
}
