mod similarity;
mod trending_recall;
mod user_cf_recall;

use crate::error::Result;
use crate::models::{RecommendRequest, ResultGroup};
use crate::services::RequestContext;
use async_trait::async_trait;

pub use similarity::{rank_neighbors, SimilarityMetric};
pub use trending_recall::TrendingRecaller;
pub use user_cf_recall::UserCfRecaller;

/// Candidate generation strategy.
///
/// Implementations should return promptly once `ctx` is cancelled.
#[async_trait]
pub trait Recaller: Send + Sync {
    async fn recall(&self, ctx: &RequestContext, request: &RecommendRequest) -> Result<ResultGroup>;

    /// Stable identifier used in logs, stats and errors.
    fn name(&self) -> &str;
}
