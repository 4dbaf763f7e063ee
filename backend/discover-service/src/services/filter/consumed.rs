use super::Filter;
use crate::error::{RecommendError, Result};
use crate::models::CandidateItem;
use crate::repo::ActionRepository;
use crate::services::RequestContext;
use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

const FILTER_NAME: &str = "consumed";

/// Drops items the user already has any recorded action on.
pub struct ConsumedFilter {
    action_repo: Arc<dyn ActionRepository>,
}

impl ConsumedFilter {
    pub fn new(action_repo: Arc<dyn ActionRepository>) -> Self {
        Self { action_repo }
    }

    async fn consumed_set(&self, user_id: &str) -> anyhow::Result<HashSet<String>> {
        let actions = self
            .action_repo
            .all_actions(user_id)
            .await
            .context("Failed to load user actions")?;
        Ok(actions.into_iter().map(|a| a.item_id).collect())
    }
}

#[async_trait]
impl Filter for ConsumedFilter {
    async fn apply(
        &self,
        _ctx: &RequestContext,
        user_id: &str,
        items: Vec<CandidateItem>,
    ) -> Result<Vec<CandidateItem>> {
        let consumed = self
            .consumed_set(user_id)
            .await
            .map_err(|e| RecommendError::filter(FILTER_NAME, e))?;

        Ok(items
            .into_iter()
            .filter(|item| !consumed.contains(&item.item_id))
            .collect())
    }

    fn name(&self) -> &str {
        FILTER_NAME
    }
}
