//! Boundary contracts to the storage collaborators.
//!
//! The pipeline only talks to behavior and content data through these traits.
//! Implementations return `anyhow::Result` with context attached; the pipeline
//! stages map failures into [`crate::error::RecommendError`] kinds.

mod memory;
mod redis_cache;

use crate::models::{Song, UserAction};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub use memory::{MemoryActionStore, MemorySimilarUserCache, MemorySongStore, MemoryTrendingStore};
pub use redis_cache::{RedisSimilarUserCache, RedisTrendingStore};

/// Behavior history lookup.
#[async_trait]
pub trait ActionRepository: Send + Sync {
    async fn all_actions(&self, user_id: &str) -> Result<Vec<UserAction>>;

    async fn batch_actions(&self, user_ids: &[String]) -> Result<HashMap<String, Vec<UserAction>>>;

    /// Users with at least one action on any of `item_ids`.
    async fn users_by_items(&self, item_ids: &[String]) -> Result<Vec<String>>;
}

/// Cache of precomputed neighbors for user-based CF.
#[async_trait]
pub trait SimilarUserCache: Send + Sync {
    async fn get_similar_users(&self, user_id: &str) -> Result<Option<Vec<String>>>;

    async fn set_similar_users(
        &self,
        user_id: &str,
        similar_users: &[String],
        ttl_secs: u64,
    ) -> Result<()>;
}

/// Detail lookup; ids without a record are simply absent from the result.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn get_by_ids(&self, item_ids: &[String]) -> Result<Vec<Song>>;
}

/// Global hot list used for cold-start recall.
#[async_trait]
pub trait TrendingStore: Send + Sync {
    /// `(item_id, score)` pairs, highest first.
    async fn top_items(&self, limit: usize) -> Result<Vec<(String, f64)>>;
}
