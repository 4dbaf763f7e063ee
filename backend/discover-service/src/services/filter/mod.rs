mod consumed;

pub use consumed::ConsumedFilter;

use crate::error::Result;
use crate::models::CandidateItem;
use crate::services::RequestContext;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Exclusion filter. Returns an order-preserving subsequence of its input and
/// never changes the surviving candidates.
#[async_trait]
pub trait Filter: Send + Sync {
    async fn apply(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        items: Vec<CandidateItem>,
    ) -> Result<Vec<CandidateItem>>;

    fn name(&self) -> &str;
}

/// Filters applied strictly in order, each consuming the previous output.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Arc<dyn Filter>>) -> Self {
        Self { filters }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub async fn apply(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        mut items: Vec<CandidateItem>,
    ) -> Result<Vec<CandidateItem>> {
        for filter in &self.filters {
            ctx.check()?;
            let before = items.len();
            items = filter.apply(ctx, user_id, items).await?;
            debug!(
                filter = filter.name(),
                before,
                after = items.len(),
                "Filter applied"
            );
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecommendError;
    use std::sync::Mutex;

    /// Drops one id and records the input it saw.
    struct DropId {
        id: &'static str,
        seen: Mutex<Vec<Vec<String>>>,
    }

    impl DropId {
        fn new(id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Filter for DropId {
        async fn apply(
            &self,
            _ctx: &RequestContext,
            _user_id: &str,
            items: Vec<CandidateItem>,
        ) -> Result<Vec<CandidateItem>> {
            self.seen
                .lock()
                .unwrap()
                .push(items.iter().map(|c| c.item_id.clone()).collect());
            Ok(items.into_iter().filter(|c| c.item_id != self.id).collect())
        }

        fn name(&self) -> &str {
            self.id
        }
    }

    struct Broken;

    #[async_trait]
    impl Filter for Broken {
        async fn apply(
            &self,
            _ctx: &RequestContext,
            _user_id: &str,
            _items: Vec<CandidateItem>,
        ) -> Result<Vec<CandidateItem>> {
            Err(RecommendError::filter("broken", anyhow::anyhow!("backend down")))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn items() -> Vec<CandidateItem> {
        ["a", "b", "c"]
            .iter()
            .map(|id| CandidateItem::new(*id, 1.0, ""))
            .collect()
    }

    #[tokio::test]
    async fn test_chain_applies_in_order() {
        let first = DropId::new("a");
        let second = DropId::new("c");
        let chain = FilterChain::new(vec![first.clone(), second.clone()]);

        let out = chain
            .apply(&RequestContext::detached(), "u1", items())
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].item_id, "b");
        // second filter sees exactly the first filter's output
        assert_eq!(second.seen.lock().unwrap()[0], vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_chain_stops_on_error() {
        let after = DropId::new("a");
        let chain = FilterChain::new(vec![Arc::new(Broken), after.clone()]);

        let err = chain
            .apply(&RequestContext::detached(), "u1", items())
            .await
            .unwrap_err();

        assert!(matches!(err, RecommendError::Filter { .. }));
        assert!(after.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_chain_is_identity() {
        let chain = FilterChain::default();
        assert!(chain.is_empty());
        let out = chain
            .apply(&RequestContext::detached(), "u1", items())
            .await
            .unwrap();
        assert_eq!(out, items());
    }
}
