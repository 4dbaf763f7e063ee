//! Ranking Module
//!
//! A ranker imposes a total relevance order on the deduplicated candidate set.
//! `ScoreRanker` is the baseline: a stable descending sort on the recall score.
//! Learned rankers plug in behind the same trait.

mod score;

pub use score::ScoreRanker;

use crate::error::Result;
use crate::models::CandidateItem;
use crate::services::RequestContext;
use async_trait::async_trait;
use std::cmp::Ordering;

#[async_trait]
pub trait Ranker: Send + Sync {
    async fn rank(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        items: Vec<CandidateItem>,
    ) -> Result<Vec<CandidateItem>>;
}

/// Descending score order with NaN treated as the lowest score.
pub(crate) fn by_score_desc(a: &CandidateItem, b: &CandidateItem) -> Ordering {
    match (a.score.is_nan(), b.score.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
    }
}

/// Stable in-place sort; equal scores keep their input order.
pub(crate) fn sort_by_score(items: &mut [CandidateItem]) {
    items.sort_by(by_score_desc);
}
