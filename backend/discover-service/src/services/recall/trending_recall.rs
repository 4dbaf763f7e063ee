use super::Recaller;
use crate::error::{RecommendError, Result};
use crate::models::{CandidateItem, RecommendRequest, ResultGroup};
use crate::repo::TrendingStore;
use crate::services::RequestContext;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

const RECALLER_NAME: &str = "trending";

/// Trending recaller - 熱門召回
/// Returns the global hot list regardless of the user; covers cold-start users.
pub struct TrendingRecaller {
    store: Arc<dyn TrendingStore>,
    limit: usize,
}

impl TrendingRecaller {
    pub fn new(store: Arc<dyn TrendingStore>, limit: usize) -> Self {
        Self { store, limit }
    }
}

#[async_trait]
impl Recaller for TrendingRecaller {
    async fn recall(&self, ctx: &RequestContext, _request: &RecommendRequest) -> Result<ResultGroup> {
        ctx.check()?;

        let trending = self
            .store
            .top_items(self.limit)
            .await
            .map_err(|e| RecommendError::retrieval(RECALLER_NAME, e))?;

        if trending.is_empty() {
            warn!("No trending songs available");
            return Ok(Vec::new());
        }

        Ok(trending
            .into_iter()
            .map(|(item_id, score)| CandidateItem::new(item_id, score, "trending now"))
            .collect())
    }

    fn name(&self) -> &str {
        RECALLER_NAME
    }
}
