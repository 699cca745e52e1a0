use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    future::{AbortRegistration, Abortable, BoxFuture},
};
use serde::Serialize;
use tracing::{debug, warn};

use std::sync::{Arc, Mutex};

use crate::{
    fetch::{RequestSlot, Ticket, Unsettled},
    indexer::MovieIndexer,
    types::MovieSummary,
};

/// Queries shorter than this (in characters) never reach the network.
pub const MIN_QUERY_LEN: usize = 3;
pub const NOT_FOUND_MESSAGE: &str = "movie not found";

/// A request spawned by a state change. The caller decides where to drive it.
pub type Task = BoxFuture<'static, ()>;

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    pub movies: Vec<MovieSummary>,
    pub is_loading: bool,
    pub error: String,
}

#[derive(Default)]
struct Shared {
    state: SearchState,
    subscribers: Vec<UnboundedSender<SearchState>>,
}

impl Shared {
    fn publish(&mut self) {
        let snapshot = self.state.clone();
        self.subscribers
            .retain(|subscriber| subscriber.unbounded_send(snapshot.clone()).is_ok());
    }
}

/// Turns query changes into search requests, applying only the outcome of the
/// most recent one.
pub struct SearchController<I> {
    indexer: Arc<I>,
    shared: Arc<Mutex<Shared>>,
    slot: RequestSlot,
}

impl<I: MovieIndexer> SearchController<I> {
    pub fn new(indexer: Arc<I>) -> SearchController<I> {
        SearchController {
            indexer,
            shared: Default::default(),
            slot: RequestSlot::default(),
        }
    }

    pub fn state(&self) -> SearchState {
        self.shared.lock().expect("Poisoned lock").state.clone()
    }

    /// Receives a snapshot after every state change
    pub fn subscribe(&self) -> UnboundedReceiver<SearchState> {
        let (tx, rx) = mpsc::unbounded();
        self.shared
            .lock()
            .expect("Poisoned lock")
            .subscribers
            .push(tx);
        rx
    }

    /// Records a new query and cancels whatever request is outstanding.
    ///
    /// Returns the request for the new query, or `None` if the query is too
    /// short to search for, in which case the results are cleared instead.
    pub fn set_query(&mut self, query: &str) -> Option<Task> {
        let mut inner = self.shared.lock().expect("Poisoned lock");
        let (ticket, registration) = self.slot.begin();
        inner.state.query = query.to_string();

        if query.chars().count() < MIN_QUERY_LEN {
            self.slot.cancel();
            inner.state.movies.clear();
            inner.state.error.clear();
            inner.state.is_loading = false;
            inner.publish();
            return None;
        }

        inner.state.is_loading = true;
        inner.state.error.clear();
        inner.publish();
        drop(inner);

        let pending = reset_on_abandon(Arc::clone(&self.shared), ticket.clone());
        Some(Box::pin(run_search(
            Arc::clone(&self.indexer),
            Arc::clone(&self.shared),
            ticket,
            registration,
            pending,
            query.to_string(),
        )))
    }
}

/// Clears the loading flag if the request is dropped, polled or not, while it
/// is still the current one.
fn reset_on_abandon(shared: Arc<Mutex<Shared>>, ticket: Ticket) -> Unsettled<impl FnOnce() + Send> {
    Unsettled::new(move || {
        let mut inner = shared.lock().expect("Poisoned lock");
        if !ticket.is_cancelled() {
            ticket.cancel();
            inner.state.is_loading = false;
            inner.publish();
        }
    })
}

async fn run_search<I: MovieIndexer>(
    indexer: Arc<I>,
    shared: Arc<Mutex<Shared>>,
    ticket: Ticket,
    registration: AbortRegistration,
    mut pending: Unsettled<impl FnOnce()>,
    query: String,
) {
    if ticket.is_cancelled() {
        return;
    }

    let outcome = Abortable::new(indexer.search(&query), registration).await;

    let mut inner = shared.lock().expect("Poisoned lock");
    pending.settle();

    // Checked under the lock so a response racing a newer query is dropped
    if ticket.is_cancelled() {
        debug!("Discarding superseded search for {query}");
        return;
    }

    let outcome = match outcome {
        Ok(v) => v,
        Err(_) => return,
    };

    match outcome {
        Ok(movies) if movies.is_empty() => {
            debug!("No results for {query}");
            inner.state.movies.clear();
            inner.state.error = NOT_FOUND_MESSAGE.to_string();
        }
        Ok(movies) => {
            debug!("Found {} results for {query}", movies.len());
            inner.state.movies = movies;
            inner.state.error.clear();
        }
        Err(e) => {
            warn!("Search for {query} failed: {e}");
            inner.state.error = e.to_string();
        }
    }

    inner.state.is_loading = false;
    inner.publish();
}
