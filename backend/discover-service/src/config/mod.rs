use crate::services::recall::SimilarityMetric;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is invalid: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub redis: RedisConfig,
    pub recall: RecallConfig,
    pub mixer: MixerConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecallConfig {
    /// Max neighbors considered by user-based CF.
    pub cf_top_k: usize,
    pub cf_min_similarity: f64,
    /// Max candidates one CF call returns.
    pub cf_result_limit: usize,
    pub cf_metric: SimilarityMetric,
    pub similar_users_ttl_secs: u64,
    pub trending_limit: usize,
    pub recaller_timeout_ms: u64,
}

impl RecallConfig {
    pub fn recaller_timeout(&self) -> Duration {
        Duration::from_millis(self.recaller_timeout_ms)
    }
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            cf_top_k: 20,
            cf_min_similarity: 0.1,
            cf_result_limit: 100,
            cf_metric: SimilarityMetric::Jaccard,
            similar_users_ttl_secs: 3600,
            trending_limit: 50,
            recaller_timeout_ms: 800,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixerPolicy {
    Simple,
    Weighted,
}

impl FromStr for MixerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(MixerPolicy::Simple),
            "weighted" => Ok(MixerPolicy::Weighted),
            other => Err(format!("unknown mixer policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MixerConfig {
    pub policy: MixerPolicy,
    pub weights: Vec<f64>,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            policy: MixerPolicy::Simple,
            weights: Vec::new(),
        }
    }
}

/// How recaller outputs reach the mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// Merge all recallers into one deduplicated group.
    #[default]
    Merged,
    /// Keep one group per recaller so the mixer can apply quotas.
    PerRecaller,
}

impl FromStr for GroupingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merged" => Ok(GroupingMode::Merged),
            "per_recaller" => Ok(GroupingMode::PerRecaller),
            other => Err(format!("unknown grouping mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    pub grouping: GroupingMode,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let recall_defaults = RecallConfig::default();

        Ok(Config {
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            recall: RecallConfig {
                cf_top_k: parse_var("CF_TOP_K", recall_defaults.cf_top_k)?,
                cf_min_similarity: parse_var("CF_MIN_SIMILARITY", recall_defaults.cf_min_similarity)?,
                cf_result_limit: parse_var("CF_RESULT_LIMIT", recall_defaults.cf_result_limit)?,
                cf_metric: parse_var("CF_SIMILARITY_METRIC", recall_defaults.cf_metric)?,
                similar_users_ttl_secs: parse_var(
                    "SIMILAR_USERS_TTL_SECS",
                    recall_defaults.similar_users_ttl_secs,
                )?,
                trending_limit: parse_var("TRENDING_RECALL_LIMIT", recall_defaults.trending_limit)?,
                recaller_timeout_ms: parse_var(
                    "RECALLER_TIMEOUT_MS",
                    recall_defaults.recaller_timeout_ms,
                )?,
            },
            mixer: MixerConfig {
                policy: parse_var("MIXER_POLICY", MixerPolicy::Simple)?,
                weights: parse_weights(env::var("MIXER_WEIGHTS").ok().as_deref())?,
            },
            pipeline: PipelineConfig {
                grouping: parse_var("PIPELINE_GROUPING", GroupingMode::Merged)?,
            },
        })
    }
}

fn parse_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parses a comma separated list such as `0.7,0.3`.
fn parse_weights(raw: Option<&str>) -> Result<Vec<f64>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let weight: f64 = part.parse().map_err(|e| ConfigError::Invalid {
                key: "MIXER_WEIGHTS",
                message: format!("{}: {}", part, e),
            })?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid {
                    key: "MIXER_WEIGHTS",
                    message: format!("weight must be a non-negative number, got {}", part),
                });
            }
            Ok(weight)
        })
        .collect()
}
