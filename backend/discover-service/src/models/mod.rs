use crate::error::{RecommendError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A candidate flowing through recall, ranking, filtering and mixing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub item_id: String,
    pub score: f64,
    pub reason: String, // diagnostic only
}

impl CandidateItem {
    pub fn new(item_id: impl Into<String>, score: f64, reason: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            score,
            reason: reason.into(),
        }
    }
}

/// Ordered output of one recaller or one stage.
pub type ResultGroup = Vec<CandidateItem>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendRequest {
    user_id: String,
    size: usize,
}

impl RecommendRequest {
    pub fn new(user_id: impl Into<String>, size: usize) -> Result<Self> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(RecommendError::InvalidRequest(
                "user_id must not be empty".to_string(),
            ));
        }
        if size == 0 {
            return Err(RecommendError::InvalidRequest(
                "size must be positive".to_string(),
            ));
        }
        Ok(Self { user_id, size })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// Detail record owned by the content repository.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub tags: Vec<String>,
    pub duration: i32,
    pub publish_time: i64,
    #[serde(default)]
    pub features: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Play,
    Like,
    Skip,
    Rate,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Play => "play",
            ActionKind::Like => "like",
            ActionKind::Skip => "skip",
            ActionKind::Rate => "rate",
        }
    }

    /// Weight applied to the action value when aggregating neighbor behavior.
    pub fn weight(&self) -> f64 {
        match self {
            ActionKind::Like => 2.0,
            ActionKind::Play => 1.0,
            ActionKind::Skip => 0.5,
            ActionKind::Rate => 1.0,
        }
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "play" => Ok(ActionKind::Play),
            "like" => Ok(ActionKind::Like),
            "skip" => Ok(ActionKind::Skip),
            "rate" => Ok(ActionKind::Rate),
            other => Err(format!("unknown action kind: {}", other)),
        }
    }
}

/// One recorded user behavior on an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAction {
    pub user_id: String,
    pub item_id: String,
    pub kind: ActionKind,
    pub value: f64, // rating for `Rate`, otherwise 0/1
    pub timestamp: i64,
}

/// Counters collected while serving one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    pub recalled: Vec<(String, usize)>,
    pub deduplicated: usize,
    pub filtered: usize,
    pub mixed: usize,
    pub hydrated: usize,
}

impl PipelineStats {
    pub fn total_recalled(&self) -> usize {
        self.recalled.iter().map(|(_, count)| count).sum()
    }
}
