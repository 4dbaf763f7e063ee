mod simple;
mod weighted;

pub use simple::SimpleMixer;
pub use weighted::WeightedMixer;

use crate::config::{MixerConfig, MixerPolicy};
use crate::error::Result;
use crate::models::ResultGroup;
use crate::services::RequestContext;
use async_trait::async_trait;
use std::sync::Arc;

/// Blends candidate groups into one list of at most `size` items.
#[async_trait]
pub trait Mixer: Send + Sync {
    async fn mix(
        &self,
        ctx: &RequestContext,
        groups: Vec<ResultGroup>,
        size: usize,
    ) -> Result<ResultGroup>;
}

/// Builds the mixer selected by configuration.
pub fn from_config(config: &MixerConfig) -> Arc<dyn Mixer> {
    match config.policy {
        MixerPolicy::Simple => Arc::new(SimpleMixer::new()),
        MixerPolicy::Weighted => Arc::new(WeightedMixer::new(config.weights.clone())),
    }
}
