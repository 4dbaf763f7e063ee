mod context;
pub mod filter;
pub mod mixer;
pub mod pipeline;
pub mod ranking;
pub mod recall;

pub use context::{CancelHandle, RequestContext};
pub use filter::{ConsumedFilter, Filter, FilterChain};
pub use mixer::{Mixer, SimpleMixer, WeightedMixer};
pub use pipeline::RecommendationService;
pub use ranking::{Ranker, ScoreRanker};
pub use recall::{Recaller, TrendingRecaller, UserCfRecaller};
