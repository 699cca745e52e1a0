use serde::Serialize;

use crate::types::WatchedEntry;

/// Aggregates shown above the watch list. Averages are `None` when there is
/// nothing to average.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WatchSummary {
    pub count: usize,
    pub avg_imdb_rating: Option<f64>,
    pub avg_user_rating: Option<f64>,
    pub avg_runtime: Option<f64>,
}

impl WatchSummary {
    pub fn new(entries: &[WatchedEntry]) -> WatchSummary {
        WatchSummary {
            count: entries.len(),
            avg_imdb_rating: average(entries.iter().filter_map(|e| e.imdb_rating)),
            avg_user_rating: average(entries.iter().map(|e| f64::from(e.user_rating))),
            avg_runtime: average(
                entries
                    .iter()
                    .filter_map(|e| e.runtime_minutes())
                    .map(f64::from),
            ),
        }
    }
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return None;
    }
    Some(sum / count as f64)
}
