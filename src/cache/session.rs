use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient, Script};

use super::{CacheError, SessionCache, keys::session_key};

// GET + DEL in one step so a concurrent login is never deleted.
const REMOVE_IF_CURRENT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// 基于 Redis 的会话缓存
pub struct RedisSessionCache {
    redis: RedisClient,
    timeout: Duration,
}

impl RedisSessionCache {
    pub fn new(redis: RedisClient, timeout: Duration) -> Self {
        Self { redis, timeout }
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, redis::RedisError>>,
    {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout),
        }
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn store(&self, username: &str, token: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let key = session_key(username);
        self.bounded(async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;
            let _: () = conn.set_ex(key, token, ttl_secs).await?;
            Ok::<_, redis::RedisError>(())
        })
        .await
    }

    async fn current(&self, username: &str) -> Result<Option<String>, CacheError> {
        let key = session_key(username);
        self.bounded(async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;
            let token: Option<String> = conn.get(key).await?;
            Ok::<_, redis::RedisError>(token)
        })
        .await
    }

    async fn remove_if_current(&self, username: &str, token: &str) -> Result<bool, CacheError> {
        let key = session_key(username);
        self.bounded(async {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;
            let removed: i64 = Script::new(REMOVE_IF_CURRENT)
                .key(key)
                .arg(token)
                .invoke_async(&mut conn)
                .await?;
            Ok::<_, redis::RedisError>(removed > 0)
        })
        .await
    }
}
