use crate::models::UserAction;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Similarity metric for user-based collaborative filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// |A ∩ B| / |A ∪ B| over the sets of touched items.
    Jaccard,
    /// Cosine over per-item `value × kind weight` vectors.
    Cosine,
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jaccard" => Ok(SimilarityMetric::Jaccard),
            "cosine" => Ok(SimilarityMetric::Cosine),
            other => Err(format!("unknown similarity metric: {}", other)),
        }
    }
}

impl SimilarityMetric {
    pub fn similarity(&self, a: &[UserAction], b: &[UserAction]) -> f64 {
        match self {
            SimilarityMetric::Jaccard => jaccard(a, b),
            SimilarityMetric::Cosine => cosine(a, b),
        }
    }
}

fn jaccard(a: &[UserAction], b: &[UserAction]) -> f64 {
    let set_a: HashSet<&str> = a.iter().map(|x| x.item_id.as_str()).collect();
    let set_b: HashSet<&str> = b.iter().map(|x| x.item_id.as_str()).collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    set_a.intersection(&set_b).count() as f64 / union as f64
}

fn preference_vector(actions: &[UserAction]) -> HashMap<&str, f64> {
    let mut vector: HashMap<&str, f64> = HashMap::new();
    for action in actions {
        *vector.entry(action.item_id.as_str()).or_insert(0.0) += action.value * action.kind.weight();
    }
    vector
}

fn cosine(a: &[UserAction], b: &[UserAction]) -> f64 {
    let va = preference_vector(a);
    let vb = preference_vector(b);

    let dot: f64 = va
        .iter()
        .filter_map(|(item, x)| vb.get(item).map(|y| x * y))
        .sum();
    let norm_a = va.values().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = vb.values().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a < f64::EPSILON || norm_b < f64::EPSILON {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Scores every candidate against the target and keeps the best `top_k`.
///
/// The target itself is skipped, neighbors below `min_similarity` are dropped,
/// and ties are ordered by user id so the result is deterministic.
pub fn rank_neighbors(
    metric: SimilarityMetric,
    target_user: &str,
    target_actions: &[UserAction],
    candidates: &HashMap<String, Vec<UserAction>>,
    min_similarity: f64,
    top_k: usize,
) -> Vec<(String, f64)> {
    let mut scored: Vec<(String, f64)> = candidates
        .iter()
        .filter(|(user_id, _)| user_id.as_str() != target_user)
        .map(|(user_id, actions)| (user_id.clone(), metric.similarity(target_actions, actions)))
        .filter(|(_, similarity)| *similarity > 0.0 && *similarity >= min_similarity)
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(top_k);
    scored
}
