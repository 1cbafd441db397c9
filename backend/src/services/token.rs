//! Access/refresh token lifecycle.
//!
//! Access tokens are stateless. Each user holds at most one live refresh
//! token, persisted as a digest; issuing a new pair overwrites it, and a
//! rotation only succeeds if the presented token is still the stored one.

use std::time::Duration;

use crate::{
    config::Config,
    db::connection::DbPool,
    error::AppError,
    models::user::User,
    repositories::user as user_repo,
    types::UserId,
    utils::jwt::{
        create_access_token, create_refresh_token, hash_refresh_token, verify_access_token,
        verify_refresh_token, Claims,
    },
};

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenService {
    access_secret: String,
    access_expiry_minutes: u64,
    refresh_secret: String,
    refresh_expiry_days: u64,
}

impl TokenService {
    pub fn from_config(config: &Config) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            access_expiry_minutes: config.access_token_expiry_minutes,
            refresh_secret: config.refresh_token_secret.clone(),
            refresh_expiry_days: config.refresh_token_expiry_days,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_expiry_minutes * 60)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_expiry_days * 24 * 60 * 60)
    }

    fn mint(&self, user: &User) -> Result<TokenPair, AppError> {
        let access_token = create_access_token(
            user.id.to_string(),
            user.user_name.clone(),
            user.email.clone(),
            &self.access_secret,
            self.access_expiry_minutes,
        )?;
        let refresh_token =
            create_refresh_token(user.id.to_string(), &self.refresh_secret, self.refresh_expiry_days)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Issues a fresh pair and makes its refresh token the only valid one.
    pub async fn issue_token_pair(&self, pool: &DbPool, user: &User) -> Result<TokenPair, AppError> {
        let pair = self.mint(user)?;
        let digest = hash_refresh_token(&pair.refresh_token);
        let stored = user_repo::set_refresh_token_hash(pool, user.id, Some(&digest))
            .await
            .map_err(|e| AppError::InternalServerError(e.into()))?;
        if !stored {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "refresh token not persisted for user {}",
                user.id
            )));
        }
        Ok(pair)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        verify_access_token(token, &self.access_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired access token".into()))
    }

    /// Exchanges a refresh token for a new pair. The presented token is dead afterwards.
    pub async fn rotate_from_refresh(
        &self,
        pool: &DbPool,
        presented: &str,
    ) -> Result<(User, TokenPair), AppError> {
        let claims = verify_refresh_token(presented, &self.refresh_secret)
            .map_err(|_| AppError::Unauthorized("Invalid refresh token".into()))?;
        let user_id: UserId = claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized("Invalid refresh token".into()))?;
        let user = user_repo::find_by_id(pool, user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".into()))?;

        let presented_digest = hash_refresh_token(presented);
        if user.refresh_token_hash.as_deref() != Some(presented_digest.as_str()) {
            tracing::warn!(user_id = %user.id, "Stale or reused refresh token presented");
            return Err(AppError::Unauthorized(
                "Refresh token is expired or used".into(),
            ));
        }

        let pair = self.mint(&user)?;
        let swapped = user_repo::swap_refresh_token_hash(
            pool,
            user.id,
            &presented_digest,
            &hash_refresh_token(&pair.refresh_token),
        )
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;
        if !swapped {
            tracing::warn!(user_id = %user.id, "Refresh token rotated concurrently");
            return Err(AppError::Unauthorized(
                "Refresh token is expired or used".into(),
            ));
        }

        Ok((user, pair))
    }

    /// Clears the stored refresh token. Safe to call repeatedly.
    pub async fn revoke(&self, pool: &DbPool, user_id: UserId) -> Result<(), AppError> {
        user_repo::set_refresh_token_hash(pool, user_id, None)
            .await
            .map_err(|e| AppError::InternalServerError(e.into()))?;
        Ok(())
    }
}
