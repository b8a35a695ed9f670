// 会话管理：登录、令牌校验、注销

use std::sync::Arc;

use thiserror::Error;

use crate::auth::{IssuedToken, Principal, Role, TokenCodec, TokenError, VerifiedToken};
use crate::cache::{CacheError, SessionCache};
use crate::config::VerifyMode;
use crate::upstream::{CredentialOracle, DirectoryError, IdentityDirectory, OracleError};

/// Why an authentication attempt failed. Callers only ever see
/// "unauthorized" or "internal error"; the detail is for logs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,
    #[error("identity directory unavailable: {0}")]
    DirectoryUnavailable(String),
    #[error("bad credentials")]
    BadCredentials,
    #[error("credential oracle unavailable: {0}")]
    OracleUnavailable(String),
    #[error("invalid token: {0}")]
    Token(TokenError),
    #[error("token is no longer the live session")]
    Superseded,
    #[error("session cache unavailable: {0}")]
    CacheUnavailable(CacheError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether the caller should see a server error rather than 401.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Internal(_) | AuthError::CacheUnavailable(_)
        )
    }

    /// Upstream outages are reported to callers as 401 but logged as errors.
    pub fn is_upstream_outage(&self) -> bool {
        matches!(
            self,
            AuthError::DirectoryUnavailable(_) | AuthError::OracleUnavailable(_)
        )
    }
}

impl From<DirectoryError> for AuthError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::NotFound | DirectoryError::Rejected(_) => AuthError::UserNotFound,
            DirectoryError::Unavailable(msg) => AuthError::DirectoryUnavailable(msg),
            DirectoryError::InvalidResponse(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<OracleError> for AuthError {
    fn from(e: OracleError) -> Self {
        AuthError::OracleUnavailable(e.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing(msg) => AuthError::Internal(msg),
            other => AuthError::Token(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub username: String,
    pub password: String,
    pub is_doctor: bool,
}

/// Runs the login and token verification flows.
pub struct SessionManager {
    directory: Arc<dyn IdentityDirectory>,
    oracle: Arc<dyn CredentialOracle>,
    codec: TokenCodec,
    cache: Arc<dyn SessionCache>,
    verify_mode: VerifyMode,
}

impl SessionManager {
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        oracle: Arc<dyn CredentialOracle>,
        codec: TokenCodec,
        cache: Arc<dyn SessionCache>,
        verify_mode: VerifyMode,
    ) -> Self {
        Self {
            directory,
            oracle,
            codec,
            cache,
            verify_mode,
        }
    }

    pub fn verify_mode(&self) -> VerifyMode {
        self.verify_mode
    }

    /// Directory lookup, password check, mint, then cache the token under
    /// the directory's canonical username.
    pub async fn login(&self, attempt: &LoginAttempt) -> Result<IssuedToken, AuthError> {
        // 角色由调用方提示决定，不从目录响应推断
        let role = Role::from_hint(attempt.is_doctor);

        let record = self
            .directory
            .find_by_username(role, &attempt.username)
            .await?;

        if !self
            .oracle
            .verify(&attempt.password, &record.password_hash)
            .await?
        {
            return Err(AuthError::BadCredentials);
        }

        let principal = Principal {
            id: record.id,
            role,
            username: record.username,
        };
        let issued = self.codec.mint(&principal)?;
        self.remember(&issued).await;

        tracing::info!(username = %principal.username, role = role.as_str(), "login succeeded");
        Ok(issued)
    }

    // A failed cache write never fails the login.
    async fn remember(&self, issued: &IssuedToken) {
        let username = &issued.principal.username;
        let ttl = issued.expires_at - self.codec.clock().now().timestamp();
        if ttl <= 0 {
            tracing::error!(%username, ttl, "refusing to cache a token that is already expired");
            return;
        }

        if let Err(e) = self.cache.store(username, &issued.token, ttl as u64).await {
            tracing::warn!(%username, error = %e, "failed to cache session token");
        }
    }

    /// Signature and expiry check, plus the cache cross-check in
    /// [`VerifyMode::CacheChecked`].
    pub async fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let verified = self.codec.verify(token)?;

        if self.verify_mode == VerifyMode::CacheChecked {
            let username = &verified.principal.username;
            match self.cache.current(username).await {
                Ok(Some(current)) if current == token => {}
                Ok(_) => return Err(AuthError::Superseded),
                Err(e) => {
                    tracing::warn!(%username, error = %e, "session cache unavailable, accepting signed token");
                }
            }
        }

        Ok(verified)
    }

    /// Ends the session if `token` is still the live one for its user.
    /// Returns whether a cache entry was removed.
    /// Drops the cached session of an already verified caller. Returns
    /// whether `token` was still the live session.
    pub async fn logout(&self, principal: &Principal, token: &str) -> Result<bool, AuthError> {
        let username = &principal.username;
        let removed = self
            .cache
            .remove_if_current(username, token)
            .await
            .map_err(AuthError::CacheUnavailable)?;

        tracing::info!(%username, removed, "logout");
        Ok(removed)
    }
}
