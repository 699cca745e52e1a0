use thiserror::Error;
use tracing::{info, warn};

use crate::{
    store::{KeyValueStore, StoreError},
    summary::WatchSummary,
    types::{ImdbId, WatchedEntry},
};

pub const WATCHED_KEY: &str = "watched";

#[derive(Debug, Error)]
pub enum WatchListError {
    #[error("movie {0} is already in the watch list")]
    AlreadyWatched(ImdbId),
    #[error("failed to serialize watch list")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to persist watch list")]
    Persist(#[source] StoreError),
}

/// Watched movies, written through to a [`KeyValueStore`] on every change.
pub struct WatchList<S> {
    store: S,
    entries: Vec<WatchedEntry>,
}

impl<S: KeyValueStore> WatchList<S> {
    /// Loads the persisted list. A missing or unreadable value starts empty.
    pub fn load(store: S) -> WatchList<S> {
        let entries = match store.get(WATCHED_KEY) {
            Ok(Some(s)) => match serde_json::from_str(&s) {
                Ok(v) => v,
                Err(e) => {
                    warn!("Ignoring invalid stored watch list: {e}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read stored watch list: {e}");
                Vec::new()
            }
        };

        info!("Loaded {} watched movies", entries.len());
        WatchList { store, entries }
    }

    pub fn entries(&self) -> &[WatchedEntry] {
        &self.entries
    }

    pub fn get(&self, id: &ImdbId) -> Option<&WatchedEntry> {
        self.entries.iter().find(|entry| entry.imdb_id == *id)
    }

    pub fn contains(&self, id: &ImdbId) -> bool {
        self.get(id).is_some()
    }

    pub fn summary(&self) -> WatchSummary {
        WatchSummary::new(&self.entries)
    }

    pub fn add(&mut self, entry: WatchedEntry) -> Result<(), WatchListError> {
        if self.contains(&entry.imdb_id) {
            return Err(WatchListError::AlreadyWatched(entry.imdb_id));
        }

        info!("Adding {} to watch list", entry.imdb_id);
        self.entries.push(entry);
        if let Err(e) = self.persist() {
            self.entries.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Returns whether an entry was removed.
    pub fn remove(&mut self, id: &ImdbId) -> Result<bool, WatchListError> {
        let position = match self.entries.iter().position(|entry| entry.imdb_id == *id) {
            Some(v) => v,
            None => return Ok(false),
        };

        info!("Removing {id} from watch list");
        let removed = self.entries.remove(position);
        if let Err(e) = self.persist() {
            self.entries.insert(position, removed);
            return Err(e);
        }
        Ok(true)
    }

    fn persist(&mut self) -> Result<(), WatchListError> {
        let serialized = serde_json::to_string(&self.entries).map_err(WatchListError::Serialize)?;
        self.store
            .set(WATCHED_KEY, &serialized)
            .map_err(WatchListError::Persist)
    }

    #[cfg(test)]
    pub fn into_store(self) -> S {
        self.store
    }
}
