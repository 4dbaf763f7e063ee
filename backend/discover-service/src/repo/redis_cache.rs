use super::{SimilarUserCache, TrendingStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

/// Redis key prefixes
const USER_SIMILAR_KEY: &str = "user:similar:";
const TRENDING_SONGS_KEY: &str = "trending:songs";

fn similar_users_key(user_id: &str) -> String {
    format!("{}{}", USER_SIMILAR_KEY, user_id)
}

/// Similar-user cache stored as a JSON array per user.
///
/// Key: `user:similar:{user_id}` with a TTL set on write.
pub struct RedisSimilarUserCache {
    redis_client: redis::Client,
}

impl RedisSimilarUserCache {
    pub fn new(redis_client: redis::Client) -> Self {
        Self { redis_client }
    }

    pub fn open(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl SimilarUserCache for RedisSimilarUserCache {
    async fn get_similar_users(&self, user_id: &str) -> Result<Option<Vec<String>>> {
        let mut conn = self
            .redis_client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to get Redis connection")?;

        let key = similar_users_key(user_id);
        let value: Option<String> = conn
            .get(&key)
            .await
            .with_context(|| format!("Redis GET failed for {}", key))?;

        match value {
            Some(json) => {
                let users: Vec<String> = serde_json::from_str(&json)
                    .with_context(|| format!("Corrupt similar-user entry at {}", key))?;
                debug!("Cache hit for {}", key);
                Ok(Some(users))
            }
            None => {
                debug!("Cache miss for {}", key);
                Ok(None)
            }
        }
    }

    async fn set_similar_users(
        &self,
        user_id: &str,
        similar_users: &[String],
        ttl_secs: u64,
    ) -> Result<()> {
        let mut conn = self
            .redis_client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to get Redis connection")?;

        let key = similar_users_key(user_id);
        let payload = serde_json::to_string(similar_users)
            .context("Failed to serialize similar users")?;

        redis::cmd("SET")
            .arg(&key)
            .arg(payload)
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async::<_, ()>(&mut conn)
            .await
            .with_context(|| format!("Redis SET failed for {}", key))?;

        Ok(())
    }
}

/// Hot list read from a sorted set (score = engagement).
pub struct RedisTrendingStore {
    redis_client: redis::Client,
    key: String,
}

impl RedisTrendingStore {
    pub fn new(redis_client: redis::Client) -> Self {
        Self {
            redis_client,
            key: TRENDING_SONGS_KEY.to_string(),
        }
    }

    pub fn with_key(redis_client: redis::Client, key: impl Into<String>) -> Self {
        Self {
            redis_client,
            key: key.into(),
        }
    }
}

#[async_trait]
impl TrendingStore for RedisTrendingStore {
    async fn top_items(&self, limit: usize) -> Result<Vec<(String, f64)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self
            .redis_client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to get Redis connection")?;

        // ZREVRANGE trending:songs 0 {limit-1} WITHSCORES
        let stop = isize::try_from(limit - 1).unwrap_or(isize::MAX);
        let results: Vec<(String, f64)> = conn
            .zrevrange_withscores(&self.key, 0, stop)
            .await
            .context("Failed to fetch trending songs from Redis")?;

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(similar_users_key("user123"), "user:similar:user123");
    }

    #[tokio::test]
    async fn test_unreachable_redis_reports_error() {
        // Port 1 is never a Redis server; the cache must report, not panic.
        let cache = RedisSimilarUserCache::open("redis://127.0.0.1:1").expect("valid url");
        assert!(cache.get_similar_users("user123").await.is_err());
        assert!(cache
            .set_similar_users("user123", &["u2".to_string()], 60)
            .await
            .is_err());
    }

    #[test]
    fn test_trending_custom_key() {
        let client = redis::Client::open("redis://localhost:6379").expect("Redis client failed");
        let store = RedisTrendingStore::with_key(client, "trending:songs:1h");
        assert_eq!(store.key, "trending:songs:1h");
    }
}
