use super::{sort_by_score, Ranker};
use crate::error::Result;
use crate::models::CandidateItem;
use crate::services::RequestContext;
use async_trait::async_trait;
use tracing::debug;

/// Score-based ranker: orders by recall score, no re-scoring.
pub struct ScoreRanker;

impl Default for ScoreRanker {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreRanker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Ranker for ScoreRanker {
    async fn rank(
        &self,
        _ctx: &RequestContext,
        user_id: &str,
        mut items: Vec<CandidateItem>,
    ) -> Result<Vec<CandidateItem>> {
        sort_by_score(&mut items);
        debug!(user_id = %user_id, ranked = items.len(), "Candidates ranked by score");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rank_descending() {
        let ranker = ScoreRanker::new();
        let items = vec![
            CandidateItem::new("a", 0.2, "x"),
            CandidateItem::new("b", 0.9, "x"),
            CandidateItem::new("c", 0.5, "x"),
        ];

        let ranked = ranker
            .rank(&RequestContext::detached(), "u1", items)
            .await
            .unwrap();

        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(ranked[0].item_id, "b");
    }

    #[tokio::test]
    async fn test_rank_is_stable_for_ties() {
        let ranker = ScoreRanker::new();
        let items = vec![
            CandidateItem::new("first", 0.5, "x"),
            CandidateItem::new("top", 0.8, "x"),
            CandidateItem::new("second", 0.5, "x"),
            CandidateItem::new("third", 0.5, "x"),
        ];

        let ranked = ranker
            .rank(&RequestContext::detached(), "u1", items)
            .await
            .unwrap();

        let ids: Vec<&str> = ranked.iter().map(|c| c.item_id.as_str()).collect();
        assert_eq!(ids, vec!["top", "first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_rank_leaves_scores_untouched() {
        let ranker = ScoreRanker::default();
        let items = vec![CandidateItem::new("a", 0.3, "why")];
        let ranked = ranker
            .rank(&RequestContext::detached(), "u1", items.clone())
            .await
            .unwrap();
        assert_eq!(ranked, items);
    }
}
