use super::Mixer;
use crate::error::{RecommendError, Result};
use crate::models::ResultGroup;
use crate::services::ranking::sort_by_score;
use crate::services::RequestContext;
use async_trait::async_trait;
use tracing::debug;

/// Quota-based mixer.
///
/// Group `i` contributes its best `floor(size * w_i / sum(w))` items and the
/// output is group-major (groups are concatenated, not re-sorted together).
/// Slots lost to the floor are not backfilled, so the output may be shorter
/// than `size` even when groups have spare items.
#[derive(Debug, Clone, Default)]
pub struct WeightedMixer {
    weights: Vec<f64>, // one per recall group
}

impl WeightedMixer {
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    /// Per-group quotas. Falls back to equal weights when the configured
    /// weights don't line up with the groups.
    pub fn quotas(&self, group_count: usize, size: usize) -> Result<Vec<usize>> {
        if group_count == 0 {
            return Ok(Vec::new());
        }

        let weights: Vec<f64> = if self.weights.len() == group_count {
            self.weights.clone()
        } else {
            vec![1.0; group_count]
        };

        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RecommendError::Mix(format!(
                "weights must be finite and non-negative: {:?}",
                weights
            )));
        }

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(RecommendError::Mix("weights sum to zero".to_string()));
        }

        Ok(weights
            .iter()
            .map(|w| (size as f64 * w / total).floor() as usize)
            .collect())
    }
}

#[async_trait]
impl Mixer for WeightedMixer {
    async fn mix(
        &self,
        _ctx: &RequestContext,
        groups: Vec<ResultGroup>,
        size: usize,
    ) -> Result<ResultGroup> {
        let quotas = self.quotas(groups.len(), size)?;
        let mut mixed = ResultGroup::new();

        for (mut group, quota) in groups.into_iter().zip(quotas.iter().copied()) {
            sort_by_score(&mut group);
            group.truncate(quota);
            mixed.extend(group);
        }

        debug!(?quotas, mixed = mixed.len(), size, "Weighted mix completed");
        Ok(mixed)
    }
}
