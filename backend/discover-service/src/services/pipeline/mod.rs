mod fan_out;
mod merge;

use crate::config::{Config, GroupingMode};
use crate::error::{RecommendError, Result};
use crate::models::{CandidateItem, PipelineStats, RecommendRequest, ResultGroup, Song};
use crate::repo::{ActionRepository, ContentRepository, SimilarUserCache, TrendingStore};
use crate::services::filter::{ConsumedFilter, Filter, FilterChain};
use crate::services::mixer::{self, Mixer};
use crate::services::ranking::{Ranker, ScoreRanker};
use crate::services::recall::{Recaller, TrendingRecaller, UserCfRecaller};
use crate::services::RequestContext;
use fan_out::{fan_out, RecallSlot};
use merge::{deduplicate, order_songs, retain_first_seen};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, Instrument};

const DEFAULT_RECALLER_TIMEOUT: Duration = Duration::from_millis(800);

/// Recommendation orchestrator
///
/// Pipeline per request:
/// 1. Fan-out: all recallers run concurrently (fail-fast, per-recaller timeout)
/// 2. Deduplicate: one candidate per item id
/// 3. Rank
/// 4. Filter chain, in order
/// 5. Mix and truncate to the requested size
/// 6. Hydrate: fetch songs and keep mixed order
///
/// No state is shared between requests.
pub struct RecommendationService {
    recallers: Vec<Arc<dyn Recaller>>,
    ranker: Arc<dyn Ranker>,
    filters: FilterChain,
    mixer: Arc<dyn Mixer>,
    content_repo: Arc<dyn ContentRepository>,
    recaller_timeout: Duration,
    grouping: GroupingMode,
}

impl RecommendationService {
    pub fn new(
        recallers: Vec<Arc<dyn Recaller>>,
        ranker: Arc<dyn Ranker>,
        filters: Vec<Arc<dyn Filter>>,
        mixer: Arc<dyn Mixer>,
        content_repo: Arc<dyn ContentRepository>,
    ) -> Self {
        Self {
            recallers,
            ranker,
            filters: FilterChain::new(filters),
            mixer,
            content_repo,
            recaller_timeout: DEFAULT_RECALLER_TIMEOUT,
            grouping: GroupingMode::Merged,
        }
    }

    /// Standard wiring: user-CF (+ trending when a store is given), score
    /// ranking, consumed filter and the configured mixer.
    pub fn from_config(
        config: &Config,
        action_repo: Arc<dyn ActionRepository>,
        similar_user_cache: Arc<dyn SimilarUserCache>,
        trending_store: Option<Arc<dyn TrendingStore>>,
        content_repo: Arc<dyn ContentRepository>,
    ) -> Self {
        let mut recallers: Vec<Arc<dyn Recaller>> = vec![Arc::new(UserCfRecaller::new(
            Arc::clone(&action_repo),
            similar_user_cache,
            &config.recall,
        ))];
        if let Some(store) = trending_store {
            recallers.push(Arc::new(TrendingRecaller::new(
                store,
                config.recall.trending_limit,
            )));
        }

        Self::new(
            recallers,
            Arc::new(ScoreRanker::new()),
            vec![Arc::new(ConsumedFilter::new(action_repo))],
            mixer::from_config(&config.mixer),
            content_repo,
        )
        .with_recaller_timeout(config.recall.recaller_timeout())
        .with_grouping(config.pipeline.grouping)
    }

    pub fn with_recaller_timeout(mut self, timeout: Duration) -> Self {
        self.recaller_timeout = timeout;
        self
    }

    pub fn with_grouping(mut self, grouping: GroupingMode) -> Self {
        self.grouping = grouping;
        self
    }

    /// Ordered songs for `user_id`, at most `size` of them.
    pub async fn get_recommendations(&self, user_id: &str, size: usize) -> Result<Vec<Song>> {
        self.recommend_with_stats(user_id, size)
            .await
            .map(|(songs, _)| songs)
    }

    pub async fn recommend_with_stats(
        &self,
        user_id: &str,
        size: usize,
    ) -> Result<(Vec<Song>, PipelineStats)> {
        let request = RecommendRequest::new(user_id, size)?;
        let (ctx, cancel) = RequestContext::new();

        let span = info_span!(
            "recommend",
            request_id = %ctx.request_id(),
            user_id = %user_id,
            size
        );

        async move {
            let mut stats = PipelineStats::default();

            // 1. Fan-out
            let slots = fan_out(&self.recallers, &ctx, &cancel, &request, self.recaller_timeout).await?;
            stats.recalled = slots
                .iter()
                .map(|(name, group)| (name.clone(), group.len()))
                .collect();

            // 2-5. Dedup, rank, filter, mix
            let mixed = match self.grouping {
                GroupingMode::Merged => self.mix_merged(&ctx, &request, slots, &mut stats).await?,
                GroupingMode::PerRecaller => {
                    self.mix_per_recaller(&ctx, &request, slots, &mut stats).await?
                }
            };
            stats.mixed = mixed.len();

            // 6. Hydrate
            let songs = self.hydrate(&mixed).await?;
            stats.hydrated = songs.len();

            info!(
                recalled = stats.total_recalled(),
                deduplicated = stats.deduplicated,
                filtered = stats.filtered,
                mixed = stats.mixed,
                hydrated = stats.hydrated,
                "Recommendation completed"
            );

            Ok((songs, stats))
        }
        .instrument(span)
        .await
    }

    async fn mix_merged(
        &self,
        ctx: &RequestContext,
        request: &RecommendRequest,
        slots: Vec<RecallSlot>,
        stats: &mut PipelineStats,
    ) -> Result<ResultGroup> {
        let unique = deduplicate(slots.into_iter().map(|(_, group)| group));
        stats.deduplicated = unique.len();

        let ranked = self.ranker.rank(ctx, request.user_id(), unique).await?;
        let filtered = self.filters.apply(ctx, request.user_id(), ranked).await?;
        stats.filtered = filtered.len();

        let mut mixed = self.mixer.mix(ctx, vec![filtered], request.size()).await?;
        mixed.truncate(request.size());
        Ok(mixed)
    }

    /// Each recaller's group is ranked and filtered on its own so the mixer
    /// sees one group per source.
    async fn mix_per_recaller(
        &self,
        ctx: &RequestContext,
        request: &RecommendRequest,
        slots: Vec<RecallSlot>,
        stats: &mut PipelineStats,
    ) -> Result<ResultGroup> {
        let mut groups = Vec::with_capacity(slots.len());
        for (name, group) in slots {
            let unique = deduplicate(std::iter::once(group));
            stats.deduplicated += unique.len();

            let ranked = self.ranker.rank(ctx, request.user_id(), unique).await?;
            let filtered = self.filters.apply(ctx, request.user_id(), ranked).await?;
            stats.filtered += filtered.len();

            debug!(recaller = %name, candidates = filtered.len(), "Group prepared for mixing");
            groups.push(filtered);
        }

        let mixed = self.mixer.mix(ctx, groups, request.size()).await?;
        let mut mixed = retain_first_seen(mixed);
        mixed.truncate(request.size());
        Ok(mixed)
    }

    async fn hydrate(&self, items: &[CandidateItem]) -> Result<Vec<Song>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let item_ids: Vec<String> = items.iter().map(|c| c.item_id.clone()).collect();
        let songs = self
            .content_repo
            .get_by_ids(&item_ids)
            .await
            .map_err(|e| RecommendError::Hydration(format!("{:#}", e)))?;

        let ordered = order_songs(&item_ids, songs);
        if ordered.len() < item_ids.len() {
            debug!(
                requested = item_ids.len(),
                found = ordered.len(),
                "Dropped candidates without song details"
            );
        }
        Ok(ordered)
    }
}
