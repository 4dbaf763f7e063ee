use super::{rank_neighbors, Recaller, SimilarityMetric};
use crate::config::RecallConfig;
use crate::error::{RecommendError, Result};
use crate::models::{CandidateItem, RecommendRequest, ResultGroup, UserAction};
use crate::repo::{ActionRepository, SimilarUserCache};
use crate::services::RequestContext;
use anyhow::Context;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

const RECALLER_NAME: &str = "user_cf";
const REASON: &str = "similar listeners";

/// User-based Collaborative Filtering recaller
///
/// Algorithm:
/// 1. Load the target user's action history
/// 2. Read similar users from the cache; on a miss, score users who touched the
///    same items with the configured metric and cache the result in the background
/// 3. Aggregate neighbor actions per item as the mean of `value × kind weight`
/// 4. Return the top `result_limit` items by score
pub struct UserCfRecaller {
    action_repo: Arc<dyn ActionRepository>,
    cache: Arc<dyn SimilarUserCache>,
    metric: SimilarityMetric,
    top_k: usize,
    min_similarity: f64,
    result_limit: usize,
    cache_ttl_secs: u64,
}

impl UserCfRecaller {
    pub fn new(
        action_repo: Arc<dyn ActionRepository>,
        cache: Arc<dyn SimilarUserCache>,
        config: &RecallConfig,
    ) -> Self {
        Self {
            action_repo,
            cache,
            metric: config.cf_metric,
            top_k: config.cf_top_k,
            min_similarity: config.cf_min_similarity,
            result_limit: config.cf_result_limit,
            cache_ttl_secs: config.similar_users_ttl_secs,
        }
    }

    /// Cache read errors count as a miss.
    async fn cached_similar_users(&self, user_id: &str) -> Option<Vec<String>> {
        match self.cache.get_similar_users(user_id).await {
            Ok(Some(users)) if !users.is_empty() => Some(users),
            Ok(_) => None,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Similar-user cache read failed, recomputing");
                None
            }
        }
    }

    async fn compute_similar_users(
        &self,
        user_id: &str,
        user_actions: &[UserAction],
    ) -> anyhow::Result<Vec<String>> {
        if user_actions.is_empty() {
            return Ok(Vec::new());
        }

        let touched: Vec<String> = user_actions
            .iter()
            .map(|a| a.item_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let mut candidates = self
            .action_repo
            .users_by_items(&touched)
            .await
            .context("Failed to look up co-listeners")?;
        candidates.retain(|candidate| candidate != user_id);

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let histories = self
            .action_repo
            .batch_actions(&candidates)
            .await
            .context("Failed to load co-listener actions")?;

        let neighbors = rank_neighbors(
            self.metric,
            user_id,
            user_actions,
            &histories,
            self.min_similarity,
            self.top_k,
        );

        debug!(
            user_id = %user_id,
            candidates = candidates.len(),
            neighbors = neighbors.len(),
            "Computed similar users"
        );

        Ok(neighbors.into_iter().map(|(id, _)| id).collect())
    }

    /// Fire-and-forget cache write; failures are only logged.
    fn populate_cache_detached(&self, user_id: &str, similar_users: Vec<String>) {
        let cache = Arc::clone(&self.cache);
        let user_id = user_id.to_string();
        let ttl = self.cache_ttl_secs;

        tokio::spawn(async move {
            if let Err(e) = cache.set_similar_users(&user_id, &similar_users, ttl).await {
                warn!(user_id = %user_id, error = %e, "Failed to cache similar users");
            }
        });
    }

    async fn aggregate_from_neighbors(&self, similar_users: &[String]) -> anyhow::Result<ResultGroup> {
        let actions_by_user = self
            .action_repo
            .batch_actions(similar_users)
            .await
            .context("Failed to load similar users' actions")?;

        // item_id -> (score sum, occurrences)
        let mut item_scores: HashMap<&str, (f64, u32)> = HashMap::new();
        for user_id in similar_users {
            let Some(actions) = actions_by_user.get(user_id) else {
                continue;
            };
            for action in actions {
                let entry = item_scores.entry(action.item_id.as_str()).or_insert((0.0, 0));
                entry.0 += action.value * action.kind.weight();
                entry.1 += 1;
            }
        }

        // Mean rather than sum so items touched by many neighbors don't dominate
        let mut items: Vec<CandidateItem> = item_scores
            .into_iter()
            .map(|(item_id, (sum, count))| CandidateItem::new(item_id, sum / count as f64, REASON))
            .collect();

        items.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        items.truncate(self.result_limit);

        Ok(items)
    }
}

#[async_trait]
impl Recaller for UserCfRecaller {
    async fn recall(&self, ctx: &RequestContext, request: &RecommendRequest) -> Result<ResultGroup> {
        let user_id = request.user_id();
        ctx.check()?;

        // Step 1: target user's history
        let actions = self
            .action_repo
            .all_actions(user_id)
            .await
            .context("Failed to load user actions")
            .map_err(|e| RecommendError::retrieval(RECALLER_NAME, e))?;

        // Step 2: neighbors, cached or computed
        let similar_users = match self.cached_similar_users(user_id).await {
            Some(users) => users,
            None => {
                ctx.check()?;
                let computed = self
                    .compute_similar_users(user_id, &actions)
                    .await
                    .map_err(|e| RecommendError::retrieval(RECALLER_NAME, e))?;
                if !computed.is_empty() {
                    self.populate_cache_detached(user_id, computed.clone());
                }
                computed
            }
        };

        if similar_users.is_empty() {
            info!(user_id = %user_id, "User-CF recall: no similar users, returning empty");
            return Ok(Vec::new());
        }

        ctx.check()?;

        // Step 3: aggregate neighbor behavior
        let candidates = self
            .aggregate_from_neighbors(&similar_users)
            .await
            .map_err(|e| RecommendError::retrieval(RECALLER_NAME, e))?;

        info!(
            user_id = %user_id,
            similar_users = similar_users.len(),
            candidates = candidates.len(),
            "User-CF recall completed"
        );

        Ok(candidates)
    }

    fn name(&self) -> &str {
        RECALLER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionKind;
    use crate::repo::{MemoryActionStore, MemorySimilarUserCache};
    use std::time::Duration;

    fn action(user: &str, item: &str, kind: ActionKind, value: f64) -> UserAction {
        UserAction {
            user_id: user.to_string(),
            item_id: item.to_string(),
            kind,
            value,
            timestamp: 0,
        }
    }

    struct FailingCache;

    #[async_trait]
    impl SimilarUserCache for FailingCache {
        async fn get_similar_users(&self, _user_id: &str) -> anyhow::Result<Option<Vec<String>>> {
            anyhow::bail!("cache down")
        }

        async fn set_similar_users(&self, _: &str, _: &[String], _: u64) -> anyhow::Result<()> {
            anyhow::bail!("cache down")
        }
    }

    struct FailingActions;

    #[async_trait]
    impl ActionRepository for FailingActions {
        async fn all_actions(&self, _user_id: &str) -> anyhow::Result<Vec<UserAction>> {
            anyhow::bail!("db unavailable")
        }

        async fn batch_actions(&self, _: &[String]) -> anyhow::Result<HashMap<String, Vec<UserAction>>> {
            anyhow::bail!("db unavailable")
        }

        async fn users_by_items(&self, _: &[String]) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("db unavailable")
        }
    }

    fn store() -> Arc<MemoryActionStore> {
        Arc::new(MemoryActionStore::with_actions(vec![
            action("me", "s1", ActionKind::Play, 1.0),
            action("me", "s2", ActionKind::Like, 1.0),
            action("n1", "s1", ActionKind::Play, 1.0),
            action("n1", "s2", ActionKind::Play, 1.0),
            action("n1", "s3", ActionKind::Like, 1.0),
            action("n2", "s2", ActionKind::Play, 1.0),
            action("n2", "s3", ActionKind::Skip, 1.0),
            action("n2", "s4", ActionKind::Play, 1.0),
            action("stranger", "s9", ActionKind::Like, 1.0),
        ]))
    }

    fn config() -> RecallConfig {
        RecallConfig {
            cf_min_similarity: 0.0,
            ..RecallConfig::default()
        }
    }

    async fn wait_for_cache(cache: &MemorySimilarUserCache, user_id: &str) -> Option<Vec<String>> {
        for _ in 0..50 {
            if let Ok(Some(users)) = cache.get_similar_users(user_id).await {
                return Some(users);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_recall_computes_neighbors_and_caches_them() {
        let cache = Arc::new(MemorySimilarUserCache::new());
        let recaller = UserCfRecaller::new(store(), cache.clone(), &config());
        let request = RecommendRequest::new("me", 10).unwrap();

        let items = recaller
            .recall(&RequestContext::detached(), &request)
            .await
            .unwrap();

        // s3: like(2.0) from n1 and skip(0.5) from n2 -> mean 1.25
        let s3 = items.iter().find(|c| c.item_id == "s3").expect("s3 recalled");
        assert!((s3.score - 1.25).abs() < 1e-9);
        assert!(items.iter().all(|c| c.item_id != "s9"));
        assert!(items.windows(2).all(|w| w[0].score >= w[1].score));

        let cached = wait_for_cache(&cache, "me").await.expect("cache populated");
        assert_eq!(cached, vec!["n1".to_string(), "n2".to_string()]);
    }

    #[tokio::test]
    async fn test_recall_uses_cached_neighbors() {
        let cache = Arc::new(MemorySimilarUserCache::new());
        cache
            .set_similar_users("me", &["stranger".to_string()], 60)
            .await
            .unwrap();
        let recaller = UserCfRecaller::new(store(), cache, &config());
        let request = RecommendRequest::new("me", 10).unwrap();

        let items = recaller
            .recall(&RequestContext::detached(), &request)
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_id, "s9");
        assert!((items[0].score - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cache_failure_does_not_fail_recall() {
        let recaller = UserCfRecaller::new(store(), Arc::new(FailingCache), &config());
        let request = RecommendRequest::new("me", 10).unwrap();

        let items = recaller
            .recall(&RequestContext::detached(), &request)
            .await
            .unwrap();
        assert!(!items.is_empty());
    }

    #[tokio::test]
    async fn test_no_similar_users_yields_empty_group() {
        let recaller = UserCfRecaller::new(
            store(),
            Arc::new(MemorySimilarUserCache::new()),
            &config(),
        );
        let request = RecommendRequest::new("newcomer", 10).unwrap();

        let items = recaller
            .recall(&RequestContext::detached(), &request)
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_result_limit_applies() {
        let config = RecallConfig {
            cf_result_limit: 2,
            ..config()
        };
        let recaller = UserCfRecaller::new(store(), Arc::new(MemorySimilarUserCache::new()), &config);
        let request = RecommendRequest::new("me", 10).unwrap();

        let items = recaller
            .recall(&RequestContext::detached(), &request)
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_action_store_failure_is_retrieval_error() {
        let recaller = UserCfRecaller::new(
            Arc::new(FailingActions),
            Arc::new(MemorySimilarUserCache::new()),
            &config(),
        );
        let request = RecommendRequest::new("me", 10).unwrap();

        let err = recaller
            .recall(&RequestContext::detached(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, RecommendError::Retrieval { ref recaller, .. } if recaller == "user_cf"));
    }

    #[tokio::test]
    async fn test_cancelled_context_short_circuits() {
        let (ctx, handle) = RequestContext::new();
        handle.cancel();
        let recaller = UserCfRecaller::new(store(), Arc::new(MemorySimilarUserCache::new()), &config());
        let request = RecommendRequest::new("me", 10).unwrap();

        let err = recaller.recall(&ctx, &request).await.unwrap_err();
        assert!(matches!(err, RecommendError::Cancelled));
    }
}
