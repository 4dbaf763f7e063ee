use super::Mixer;
use crate::error::Result;
use crate::models::ResultGroup;
use crate::services::ranking::sort_by_score;
use crate::services::RequestContext;
use async_trait::async_trait;

/// Concatenates all groups, sorts by score and truncates.
#[derive(Debug, Default)]
pub struct SimpleMixer;

impl SimpleMixer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mixer for SimpleMixer {
    async fn mix(
        &self,
        _ctx: &RequestContext,
        groups: Vec<ResultGroup>,
        size: usize,
    ) -> Result<ResultGroup> {
        let mut all: ResultGroup = groups.into_iter().flatten().collect();
        sort_by_score(&mut all);
        all.truncate(size);
        Ok(all)
    }
}
