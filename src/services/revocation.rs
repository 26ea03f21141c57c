//! Revocation ledger: tokens explicitly invalidated by logout

use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    repository::RevokedTokensRepository,
};

#[derive(Clone)]
pub struct RevocationLedger {
    tokens: Arc<dyn RevokedTokensRepository>,
}

impl RevocationLedger {
    pub fn new(tokens: Arc<dyn RevokedTokensRepository>) -> Self {
        Self { tokens }
    }

    /// Record a token as revoked. A token can only be revoked once.
    pub async fn revoke(&self, token: &str, user_id: i32) -> AppResult<()> {
        if !self.tokens.insert(token, user_id, Utc::now()).await? {
            return Err(AppError::AlreadyRevoked);
        }
        Ok(())
    }

    pub async fn is_revoked(&self, token: &str) -> AppResult<bool> {
        self.tokens.exists(token).await
    }

    /// Drop every ledger entry owned by the user.
    ///
    /// This only forgets bookkeeping, it does not end earlier sessions. A
    /// token from an earlier session that was never revoked stays valid
    /// until its own expiry, and a token revoked before the purge is
    /// accepted again if it has not expired yet.
    pub async fn purge_for_user(&self, user_id: i32) -> AppResult<u64> {
        self.tokens.delete_for_user(user_id).await
    }

    pub async fn count_for_user(&self, user_id: i32) -> AppResult<i64> {
        self.tokens.count_for_user(user_id).await
    }
}
