use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the recommendation pipeline.
///
/// Every stage maps its failures into one of these kinds and the orchestrator
/// returns them to the caller unchanged. Similar-user cache failures never show
/// up here; they are handled inside the collaborative filtering recaller.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Recall failed in {recaller}: {message}")]
    Retrieval { recaller: String, message: String },

    #[error("Recaller {recaller} timed out after {elapsed:?}")]
    RecallTimeout { recaller: String, elapsed: Duration },

    #[error("Ranking failed: {0}")]
    Ranking(String),

    #[error("Filter {filter} failed: {message}")]
    Filter { filter: String, message: String },

    #[error("Mixing failed: {0}")]
    Mix(String),

    #[error("Hydration failed: {0}")]
    Hydration(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl RecommendError {
    pub fn retrieval(recaller: &str, err: anyhow::Error) -> Self {
        RecommendError::Retrieval {
            recaller: recaller.to_string(),
            message: format!("{:#}", err),
        }
    }

    pub fn filter(filter: &str, err: anyhow::Error) -> Self {
        RecommendError::Filter {
            filter: filter.to_string(),
            message: format!("{:#}", err),
        }
    }

    /// Whether the error came out of the fan-out stage.
    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            RecommendError::Retrieval { .. } | RecommendError::RecallTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RecommendError>;
