use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq, Hash)]
#[serde(transparent)]
pub struct ImdbId(pub String);

impl fmt::Display for ImdbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of a search result list.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct MovieSummary {
    pub imdb_id: ImdbId,
    pub title: String,
    pub year: String,
    pub poster: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MovieDetail {
    pub imdb_id: ImdbId,
    pub title: String,
    pub year: String,
    pub poster: String,
    pub plot: String,
    pub imdb_rating: Option<f64>,
    pub runtime: String,
    pub genre: String,
    pub actors: String,
    pub director: String,
    pub released: Option<NaiveDate>,
}

/// A movie the user has confirmed as watched, along with their own rating.
///
/// This is the unit persisted in the watch list, so changing field names here
/// changes the stored format.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WatchedEntry {
    pub imdb_id: ImdbId,
    pub title: String,
    pub year: String,
    pub poster: String,
    pub imdb_rating: Option<f64>,
    pub runtime: String,
    pub user_rating: u8,
    pub rating_revisions: u32,
}

impl WatchedEntry {
    pub fn from_detail(detail: &MovieDetail, user_rating: u8, rating_revisions: u32) -> Self {
        WatchedEntry {
            imdb_id: detail.imdb_id.clone(),
            title: detail.title.clone(),
            year: detail.year.clone(),
            poster: detail.poster.clone(),
            imdb_rating: detail.imdb_rating,
            runtime: detail.runtime.clone(),
            user_rating,
            rating_revisions,
        }
    }

    /// Runtime in minutes, parsed from strings like "136 min"
    pub fn runtime_minutes(&self) -> Option<u32> {
        self.runtime.split_whitespace().next()?.parse().ok()
    }
}
