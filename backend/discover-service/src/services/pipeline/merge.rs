use crate::models::{CandidateItem, Song};
use crate::services::ranking::by_score_desc;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Merges groups into one list with unique item ids.
///
/// Groups are visited in the order given (recaller configuration order, not
/// completion order). A duplicate replaces the kept instance only when its
/// score is strictly higher, so equal scores keep the first instance. The
/// surviving instance stays at the position where the id was first seen.
pub(crate) fn deduplicate<I>(groups: I) -> Vec<CandidateItem>
where
    I: IntoIterator<Item = Vec<CandidateItem>>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<CandidateItem> = Vec::new();

    for item in groups.into_iter().flatten() {
        match positions.get(&item.item_id) {
            Some(&pos) => {
                if by_score_desc(&item, &unique[pos]) == Ordering::Less {
                    unique[pos] = item;
                }
            }
            None => {
                positions.insert(item.item_id.clone(), unique.len());
                unique.push(item);
            }
        }
    }

    unique
}

/// Keeps the first occurrence of every id, preserving order.
pub(crate) fn retain_first_seen(items: Vec<CandidateItem>) -> Vec<CandidateItem> {
    let mut seen: HashSet<String> = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.item_id.clone()))
        .collect()
}

/// Re-projects fetched songs into candidate order, dropping ids with no record.
pub(crate) fn order_songs(item_ids: &[String], songs: Vec<Song>) -> Vec<Song> {
    let mut by_id: HashMap<String, Song> = songs.into_iter().map(|s| (s.id.clone(), s)).collect();
    item_ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, score: f64, reason: &str) -> CandidateItem {
        CandidateItem::new(id, score, reason)
    }

    fn song(id: &str) -> Song {
        Song {
            id: id.to_string(),
            name: format!("song {}", id),
            ..Default::default()
        }
    }

    #[test]
    fn test_deduplicate_keeps_highest_score() {
        let unique = deduplicate(vec![
            vec![item("s1", 0.4, "cf"), item("s2", 0.5, "cf")],
            vec![item("s1", 0.9, "trending"), item("s3", 0.1, "trending")],
        ]);

        assert_eq!(unique.len(), 3);
        assert_eq!(unique[0], item("s1", 0.9, "trending"));
        assert_eq!(unique[1].item_id, "s2");
        assert_eq!(unique[2].item_id, "s3");
    }

    #[test]
    fn test_deduplicate_tie_keeps_first_group() {
        let unique = deduplicate(vec![
            vec![item("s1", 0.5, "cf")],
            vec![item("s1", 0.5, "trending")],
        ]);
        assert_eq!(unique, vec![item("s1", 0.5, "cf")]);
    }

    #[test]
    fn test_deduplicate_ids_unique() {
        let groups: Vec<Vec<CandidateItem>> = (0..4)
            .map(|g| (0..10).map(|i| item(&format!("s{}", i % 7), (g * i) as f64, "")).collect())
            .collect();
        let unique = deduplicate(groups);
        let ids: HashSet<&str> = unique.iter().map(|c| c.item_id.as_str()).collect();
        assert_eq!(ids.len(), unique.len());
        assert_eq!(unique.len(), 7);
    }

    #[test]
    fn test_retain_first_seen() {
        let out = retain_first_seen(vec![item("a", 0.1, "x"), item("b", 0.2, ""), item("a", 0.9, "y")]);
        assert_eq!(out, vec![item("a", 0.1, "x"), item("b", 0.2, "")]);
    }

    #[test]
    fn test_order_songs_drops_missing() {
        let ids = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        let ordered = order_songs(&ids, vec![song("z"), song("x")]);
        let out: Vec<&str> = ordered.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(out, vec!["x", "z"]);
    }
}
