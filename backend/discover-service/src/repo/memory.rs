use super::{ActionRepository, ContentRepository, SimilarUserCache, TrendingStore};
use crate::models::{Song, UserAction};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// In-process action history keyed by user.
#[derive(Default)]
pub struct MemoryActionStore {
    actions: DashMap<String, Vec<UserAction>>,
}

impl MemoryActionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, action: UserAction) {
        self.actions
            .entry(action.user_id.clone())
            .or_default()
            .push(action);
    }

    pub fn with_actions(actions: impl IntoIterator<Item = UserAction>) -> Self {
        let store = Self::new();
        for action in actions {
            store.record(action);
        }
        store
    }
}

#[async_trait]
impl ActionRepository for MemoryActionStore {
    async fn all_actions(&self, user_id: &str) -> Result<Vec<UserAction>> {
        Ok(self
            .actions
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn batch_actions(&self, user_ids: &[String]) -> Result<HashMap<String, Vec<UserAction>>> {
        Ok(user_ids
            .iter()
            .filter_map(|user_id| {
                self.actions
                    .get(user_id)
                    .map(|entry| (user_id.clone(), entry.value().clone()))
            })
            .collect())
    }

    async fn users_by_items(&self, item_ids: &[String]) -> Result<Vec<String>> {
        let wanted: HashSet<&str> = item_ids.iter().map(String::as_str).collect();
        let mut users: Vec<String> = self
            .actions
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .iter()
                    .any(|action| wanted.contains(action.item_id.as_str()))
            })
            .map(|entry| entry.key().clone())
            .collect();
        // DashMap iteration order is arbitrary
        users.sort();
        Ok(users)
    }
}

/// In-process song catalog.
#[derive(Default)]
pub struct MemorySongStore {
    songs: DashMap<String, Song>,
}

impl MemorySongStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, song: Song) {
        self.songs.insert(song.id.clone(), song);
    }

    pub fn with_songs(songs: impl IntoIterator<Item = Song>) -> Self {
        let store = Self::new();
        for song in songs {
            store.insert(song);
        }
        store
    }
}

#[async_trait]
impl ContentRepository for MemorySongStore {
    async fn get_by_ids(&self, item_ids: &[String]) -> Result<Vec<Song>> {
        Ok(item_ids
            .iter()
            .filter_map(|id| self.songs.get(id).map(|entry| entry.value().clone()))
            .collect())
    }
}

const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

struct CachedNeighbors {
    users: Vec<String>,
    expires_at: DateTime<Utc>,
}

/// Similar-user cache with per-entry expiry.
#[derive(Default)]
pub struct MemorySimilarUserCache {
    entries: DashMap<String, CachedNeighbors>,
}

impl MemorySimilarUserCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SimilarUserCache for MemorySimilarUserCache {
    async fn get_similar_users(&self, user_id: &str) -> Result<Option<Vec<String>>> {
        let now = Utc::now();
        let hit = match self.entries.get(user_id) {
            Some(entry) if entry.expires_at > now => Some(entry.users.clone()),
            Some(_) => None,
            None => return Ok(None),
        };

        if hit.is_none() {
            self.entries.remove(user_id);
        }
        Ok(hit)
    }

    async fn set_similar_users(
        &self,
        user_id: &str,
        similar_users: &[String],
        ttl_secs: u64,
    ) -> Result<()> {
        let ttl = Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64);
        self.entries.insert(
            user_id.to_string(),
            CachedNeighbors {
                users: similar_users.to_vec(),
                expires_at: Utc::now() + ttl,
            },
        );
        Ok(())
    }
}

/// Fixed hot list, replaced wholesale by `set_items`.
#[derive(Default)]
pub struct MemoryTrendingStore {
    items: RwLock<Vec<(String, f64)>>,
}

impl MemoryTrendingStore {
    pub fn new(items: Vec<(String, f64)>) -> Self {
        let store = Self::default();
        store.set_items(items);
        store
    }

    pub fn set_items(&self, mut items: Vec<(String, f64)>) {
        items.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        match self.items.write() {
            Ok(mut guard) => *guard = items,
            Err(poisoned) => *poisoned.into_inner() = items,
        }
    }
}

#[async_trait]
impl TrendingStore for MemoryTrendingStore {
    async fn top_items(&self, limit: usize) -> Result<Vec<(String, f64)>> {
        let guard = self
            .items
            .read()
            .map_err(|_| anyhow::anyhow!("trending list lock poisoned"))?;
        Ok(guard.iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionKind;

    fn action(user: &str, item: &str) -> UserAction {
        UserAction {
            user_id: user.to_string(),
            item_id: item.to_string(),
            kind: ActionKind::Play,
            value: 1.0,
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_users_by_items() {
        let store = MemoryActionStore::with_actions(vec![
            action("u2", "s1"),
            action("u1", "s1"),
            action("u3", "s9"),
        ]);

        let users = store.users_by_items(&["s1".to_string()]).await.unwrap();
        assert_eq!(users, vec!["u1".to_string(), "u2".to_string()]);
    }

    #[tokio::test]
    async fn test_batch_actions_skips_unknown_users() {
        let store = MemoryActionStore::with_actions(vec![action("u1", "s1")]);
        let map = store
            .batch_actions(&["u1".to_string(), "ghost".to_string()])
            .await
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["u1"].len(), 1);
    }

    #[tokio::test]
    async fn test_similar_user_cache_expiry() {
        let cache = MemorySimilarUserCache::new();
        cache
            .set_similar_users("u1", &["u2".to_string()], 60)
            .await
            .unwrap();
        assert_eq!(
            cache.get_similar_users("u1").await.unwrap(),
            Some(vec!["u2".to_string()])
        );

        cache.set_similar_users("u1", &["u2".to_string()], 0).await.unwrap();
        assert_eq!(cache.get_similar_users("u1").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_trending_store_sorted() {
        let store = MemoryTrendingStore::new(vec![("a".into(), 1.0), ("b".into(), 3.0)]);
        let top = store.top_items(1).await.unwrap();
        assert_eq!(top, vec![("b".to_string(), 3.0)]);
    }
}
