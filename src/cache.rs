use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use thiserror::Error;
use tokio::sync::OnceCell;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache key is empty")]
    EmptyKey,
    #[error("cache expiration must be positive")]
    NonPositiveTtl,
    #[error("cache backend failure: {0}")]
    Backend(String),
}

/// Key-value store the scraper reads through. Failures are never fatal to callers.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns `Ok(None)` for missing or expired keys.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Lifetimes applied to cached payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheTtl {
    pub schedule: Duration,
    pub listing: Duration,
}

impl CacheTtl {
    pub fn from_minutes(schedule: u64, listing: u64) -> Self {
        Self {
            schedule: Duration::from_secs(schedule * 60),
            listing: Duration::from_secs(listing * 60),
        }
    }
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self::from_minutes(5, 60)
    }
}

pub const GROUPS_KEY: &str = "groups";
pub const TEACHERS_KEY: &str = "teachers";

pub fn announcements_key(page: u32) -> String {
    format!("announce?page={page}")
}

/// Process-local store with per-entry expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>>, CacheError> {
        self.entries
            .lock()
            .map_err(|err| CacheError::Backend(err.to_string()))
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }

        let mut entries = self.lock()?;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }
        if ttl.is_zero() {
            return Err(CacheError::NonPositiveTtl);
        }

        let now = Instant::now();
        let mut entries = self.lock()?;
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(())
    }
}

const REDIS_TIMEOUT: Duration = Duration::from_secs(1);

/// Redis-backed store shared by every instance pointed at the same server.
///
/// The connection is opened on first use and re-established by the manager
/// after the server goes away.
pub struct RedisCache {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
}

impl RedisCache {
    pub fn new(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(backend_error)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        self.connection
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await
            .cloned()
            .map_err(backend_error)
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(backend_error)?;
        Ok(value.filter(|value| !value.is_empty()))
    }

    async fn set_value(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        // EX takes whole seconds
        let seconds = ttl.as_secs().max(1);
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async(&mut conn)
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }

        tokio::time::timeout(REDIS_TIMEOUT, self.get_value(key))
            .await
            .map_err(|_| CacheError::Backend("redis read timed out".into()))?
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }
        if ttl.is_zero() {
            return Err(CacheError::NonPositiveTtl);
        }

        tokio::time::timeout(REDIS_TIMEOUT, self.set_value(key, value, ttl))
            .await
            .map_err(|_| CacheError::Backend("redis write timed out".into()))?
    }
}

fn backend_error(err: redis::RedisError) -> CacheError {
    CacheError::Backend(err.to_string())
}

/// Used when caching is switched off: every read misses, every write is dropped.
#[derive(Clone, Copy, Default)]
pub struct NoCache;

#[async_trait]
impl Cache for NoCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DaySchedule, Lesson, Subgroup};

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        cache
            .set("2024/8:114808", "payload", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            cache.get("2024/8:114808").await.unwrap().as_deref(),
            Some("payload")
        );
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_week_schedule_is_preserved() {
        let week = vec![DaySchedule {
            date: "19 февраля 2024, понедельник".to_string(),
            lessons: vec![Lesson {
                number: "1".to_string(),
                time: "08:30 - 10:00".to_string(),
                subject: "Математика".to_string(),
                room: "А-12".to_string(),
                subgroup: Subgroup::First,
                ..Lesson::default()
            }],
            href: "https://hmtpk.ru/ru/students/schedule/".to_string(),
        }];

        let cache = MemoryCache::new();
        let payload = serde_json::to_string(&week).unwrap();
        cache
            .set("2024/8:114808", &payload, Duration::from_secs(300))
            .await
            .unwrap();

        let stored = cache.get("2024/8:114808").await.unwrap().unwrap();
        let restored: Vec<DaySchedule> = serde_json::from_str(&stored).unwrap();
        assert_eq!(restored, week);
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemoryCache::new();
        cache
            .set("groups", "[]", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("groups").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_evicts_expired_entries_on_set() {
        let cache = MemoryCache::new();
        for page in 1..=1000 {
            cache
                .set(&announcements_key(page), "[]", Duration::from_millis(1))
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache
            .set("2024/8:114808", "[]", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.entries.lock().unwrap().len(), 1);
        assert!(cache.get("2024/8:114808").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_memory_cache_rejects_bad_input() {
        let cache = MemoryCache::new();
        assert!(matches!(
            cache.set("", "v", Duration::from_secs(1)).await,
            Err(CacheError::EmptyKey)
        ));
        assert!(matches!(
            cache.set("k", "v", Duration::ZERO).await,
            Err(CacheError::NonPositiveTtl)
        ));
        assert!(matches!(cache.get("").await, Err(CacheError::EmptyKey)));
    }

    #[tokio::test]
    async fn test_no_cache_always_misses() {
        let cache = NoCache;
        cache.set("k", "v", Duration::from_secs(1)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[test]
    fn test_redis_cache_rejects_invalid_url() {
        assert!(matches!(
            RedisCache::new("not a redis url"),
            Err(CacheError::Backend(_))
        ));
        assert!(RedisCache::new("redis://127.0.0.1:6379/").is_ok());
    }

    #[tokio::test]
    async fn test_redis_cache_validates_before_connecting() {
        // nothing listens on this port
        let cache = RedisCache::new("redis://127.0.0.1:9/").unwrap();
        assert!(matches!(
            cache.set("", "v", Duration::from_secs(1)).await,
            Err(CacheError::EmptyKey)
        ));
        assert!(matches!(
            cache.set("k", "v", Duration::ZERO).await,
            Err(CacheError::NonPositiveTtl)
        ));
        assert!(matches!(cache.get("").await, Err(CacheError::EmptyKey)));
    }

    #[tokio::test]
    async fn test_redis_cache_unreachable_server_is_a_backend_error() {
        let cache = RedisCache::new("redis://127.0.0.1:9/").unwrap();
        let started = Instant::now();
        assert!(matches!(
            cache.get("groups").await,
            Err(CacheError::Backend(_))
        ));
        assert!(started.elapsed() < REDIS_TIMEOUT + Duration::from_millis(500));
    }

    #[test]
    fn test_keys_and_ttl() {
        assert_eq!(announcements_key(3), "announce?page=3");
        let ttl = CacheTtl::default();
        assert_eq!(ttl.schedule, Duration::from_secs(300));
        assert_eq!(ttl.listing, Duration::from_secs(3600));
    }
}
