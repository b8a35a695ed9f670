use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{CacheError, SessionCache};

struct Entry {
    token: String,
    expires_at: Instant,
}

/// In-process session cache for single-instance deployments and tests.
/// Expired entries are dropped lazily on access.
#[derive(Default)]
pub struct MemorySessionCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn store(&self, username: &str, token: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.expires_at > Instant::now());
        entries.insert(
            username.to_string(),
            Entry {
                token: token.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn current(&self, username: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(username)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.token.clone()))
    }

    async fn remove_if_current(&self, username: &str, token: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.write().await;
        match entries.get(username) {
            Some(e) if e.token == token && e.expires_at > Instant::now() => {
                entries.remove(username);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn later_store_overwrites_earlier() {
        let cache = MemorySessionCache::new();
        cache.store("alice", "t1", 60).await.unwrap();
        cache.store("alice", "t2", 60).await.unwrap();

        assert_eq!(cache.current("alice").await.unwrap().as_deref(), Some("t2"));
        assert!(cache.is_live("alice", "t2").await.unwrap());
        assert!(!cache.is_live("alice", "t1").await.unwrap());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_disappear_after_ttl() {
        let cache = MemorySessionCache::new();
        cache.store("alice", "t1", 10).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cache.is_live("alice", "t1").await.unwrap());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.current("alice").await.unwrap(), None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn remove_only_deletes_matching_token() {
        let cache = MemorySessionCache::new();
        cache.store("alice", "t2", 60).await.unwrap();

        assert!(!cache.remove_if_current("alice", "t1").await.unwrap());
        assert!(cache.is_live("alice", "t2").await.unwrap());

        assert!(cache.remove_if_current("alice", "t2").await.unwrap());
        assert_eq!(cache.current("alice").await.unwrap(), None);
        assert!(!cache.remove_if_current("bob", "t2").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_stores_leave_one_complete_value() {
        let cache = std::sync::Arc::new(MemorySessionCache::new());
        let writers: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .store("alice", &format!("token-{i}"), 60)
                        .await
                        .unwrap();
                })
            })
            .collect();
        for w in writers {
            w.await.unwrap();
        }

        let stored = cache.current("alice").await.unwrap().unwrap();
        let n: usize = stored.strip_prefix("token-").unwrap().parse().unwrap();
        assert!(n < 16);
    }
}
