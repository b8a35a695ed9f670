// 会话缓存模块
// 每个用户名只保存最近一次签发的令牌，过期时间与令牌一致

pub mod keys;
pub mod memory;
pub mod session;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemorySessionCache;
pub use session::RedisSessionCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("cache operation timed out")]
    Timeout,
}

/// Username → current token store with per-entry TTL.
///
/// Writes for the same username are last-writer-wins.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Upserts the token for `username`. `ttl_secs` must be positive.
    async fn store(&self, username: &str, token: &str, ttl_secs: u64) -> Result<(), CacheError>;

    /// Returns the token currently held for `username`, if any.
    async fn current(&self, username: &str) -> Result<Option<String>, CacheError>;

    /// Deletes the entry only while it still holds `token`. Returns whether
    /// something was removed.
    async fn remove_if_current(&self, username: &str, token: &str) -> Result<bool, CacheError>;

    async fn is_live(&self, username: &str, token: &str) -> Result<bool, CacheError> {
        Ok(self.current(username).await?.as_deref() == Some(token))
    }
}
