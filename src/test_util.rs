use futures::{
    channel::oneshot,
    future::BoxFuture,
    task::{noop_waker_ref, Context, Poll},
    FutureExt,
};
use thiserror::Error;

use std::{collections::HashMap, sync::Mutex};

use crate::{
    indexer::MovieIndexer,
    types::{ImdbId, MovieDetail, MovieSummary},
};

pub type SearchReply = Result<Vec<MovieSummary>, FakeError>;
pub type DetailReply = Result<MovieDetail, FakeError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FakeError {
    #[error("network unreachable")]
    Network,
    #[error("no response registered for {0}")]
    Unexpected(String),
    #[error("response dropped")]
    Dropped,
}

/// Indexer whose responses are released by the test through oneshot senders.
#[derive(Default)]
pub struct FakeIndexer {
    searches: Mutex<HashMap<String, oneshot::Receiver<SearchReply>>>,
    details: Mutex<HashMap<ImdbId, oneshot::Receiver<DetailReply>>>,
    search_calls: Mutex<Vec<String>>,
    detail_calls: Mutex<Vec<ImdbId>>,
}

impl FakeIndexer {
    pub fn expect_search(&self, query: &str) -> oneshot::Sender<SearchReply> {
        let (tx, rx) = oneshot::channel();
        self.searches
            .lock()
            .expect("Poisoned lock")
            .insert(query.to_string(), rx);
        tx
    }

    pub fn expect_details(&self, id: &ImdbId) -> oneshot::Sender<DetailReply> {
        let (tx, rx) = oneshot::channel();
        self.details
            .lock()
            .expect("Poisoned lock")
            .insert(id.clone(), rx);
        tx
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.search_calls.lock().expect("Poisoned lock").clone()
    }

    pub fn detail_calls(&self) -> Vec<ImdbId> {
        self.detail_calls.lock().expect("Poisoned lock").clone()
    }
}

impl MovieIndexer for FakeIndexer {
    type Err = FakeError;

    fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, SearchReply> {
        self.search_calls
            .lock()
            .expect("Poisoned lock")
            .push(query.to_string());
        let reply = self.searches.lock().expect("Poisoned lock").remove(query);

        Box::pin(async move {
            match reply {
                Some(rx) => rx.await.unwrap_or(Err(FakeError::Dropped)),
                None => Err(FakeError::Unexpected(query.to_string())),
            }
        })
    }

    fn details<'a>(&'a self, id: &'a ImdbId) -> BoxFuture<'a, DetailReply> {
        self.detail_calls
            .lock()
            .expect("Poisoned lock")
            .push(id.clone());
        let reply = self.details.lock().expect("Poisoned lock").remove(id);

        Box::pin(async move {
            match reply {
                Some(rx) => rx.await.unwrap_or(Err(FakeError::Dropped)),
                None => Err(FakeError::Unexpected(id.0.clone())),
            }
        })
    }
}

/// Polls a task exactly once without an executor.
pub fn poll_once(task: &mut BoxFuture<'static, ()>) -> Poll<()> {
    let mut cx = Context::from_waker(noop_waker_ref());
    task.poll_unpin(&mut cx)
}

pub fn summary(id: &str, title: &str) -> MovieSummary {
    MovieSummary {
        imdb_id: ImdbId(id.to_string()),
        title: title.to_string(),
        year: "1999".to_string(),
        poster: "N/A".to_string(),
    }
}

pub fn matrix_results() -> Vec<MovieSummary> {
    vec![
        summary("tt0133093", "The Matrix"),
        summary("tt0234215", "The Matrix Reloaded"),
        summary("tt0242653", "The Matrix Revolutions"),
    ]
}

pub fn detail(id: &str, title: &str) -> MovieDetail {
    MovieDetail {
        imdb_id: ImdbId(id.to_string()),
        title: title.to_string(),
        year: "1999".to_string(),
        poster: "N/A".to_string(),
        plot: "A hacker learns the truth.".to_string(),
        imdb_rating: Some(8.7),
        runtime: "136 min".to_string(),
        genre: "Action, Sci-Fi".to_string(),
        actors: "Keanu Reeves".to_string(),
        director: "Lana Wachowski, Lilly Wachowski".to_string(),
        released: None,
    }
}
