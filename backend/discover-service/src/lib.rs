pub mod config;
pub mod error;
pub mod models;
pub mod repo;
pub mod services;
pub mod telemetry;

pub use config::Config;
pub use error::{RecommendError, Result};
pub use models::{CandidateItem, RecommendRequest, ResultGroup, Song};
pub use services::RecommendationService;
