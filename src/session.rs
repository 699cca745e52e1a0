use futures::future::{self, AbortRegistration, Abortable, FutureExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use std::sync::{Arc, Mutex};

use crate::{
    fetch::{RequestSlot, Ticket, Unsettled},
    indexer::MovieIndexer,
    keys::{KeyBinding, Keyboard},
    search::{SearchController, SearchState, Task},
    store::KeyValueStore,
    types::{ImdbId, MovieDetail, WatchedEntry},
    watchlist::{WatchList, WatchListError},
};

pub const MAX_USER_RATING: u8 = 10;
const CLOSE_KEY: &str = "Escape";
const CLEAR_SEARCH_KEY: &str = "Enter";
pub const ABANDONED_MESSAGE: &str = "request cancelled";

/// User intents understood by [`Session::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetQuery(String),
    SelectMovie(ImdbId),
    CloseDetail,
    SetUserRating(u8),
    AddWatched,
    DeleteWatched(ImdbId),
    KeyPress(String),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no movie is selected")]
    NoDetailOpen,
    #[error("movie details are not loaded yet")]
    DetailNotLoaded,
    #[error("rate the movie before adding it")]
    NoRating,
    #[error("rating must be between 1 and 10, got {0}")]
    InvalidRating(u8),
    #[error(transparent)]
    WatchList(#[from] WatchListError),
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct DetailState {
    pub movie: Option<MovieDetail>,
    pub is_loading: bool,
    pub error: String,
}

/// The open detail view for one selected movie.
///
/// Dropping it cancels the detail request and removes the close key binding.
pub struct DetailView {
    id: ImdbId,
    shared: Arc<Mutex<DetailState>>,
    user_rating: Option<u8>,
    rating_revisions: u32,
    _slot: RequestSlot,
    _close_binding: KeyBinding,
}

impl DetailView {
    pub fn id(&self) -> &ImdbId {
        &self.id
    }

    pub fn state(&self) -> DetailState {
        self.shared.lock().expect("Poisoned lock").clone()
    }

    pub fn user_rating(&self) -> Option<u8> {
        self.user_rating
    }

    pub fn rating_revisions(&self) -> u32 {
        self.rating_revisions
    }
}

pub struct Session<I, S> {
    indexer: Arc<I>,
    search: SearchController<I>,
    watched: WatchList<S>,
    keyboard: Keyboard<Command>,
    detail: Option<DetailView>,
    _clear_search_binding: KeyBinding,
}

impl<I: MovieIndexer, S: KeyValueStore> Session<I, S> {
    pub fn new(indexer: Arc<I>, store: S) -> Session<I, S> {
        let keyboard = Keyboard::default();
        let clear_search_binding =
            keyboard.bind(CLEAR_SEARCH_KEY, Command::SetQuery(String::new()));

        Session {
            search: SearchController::new(Arc::clone(&indexer)),
            indexer,
            watched: WatchList::load(store),
            keyboard,
            detail: None,
            _clear_search_binding: clear_search_binding,
        }
    }

    pub fn search_state(&self) -> SearchState {
        self.search.state()
    }

    pub fn search(&self) -> &SearchController<I> {
        &self.search
    }

    pub fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    pub fn watch_list(&self) -> &WatchList<S> {
        &self.watched
    }

    /// Applies a command. Any request it starts is returned for the caller to
    /// drive; the session lock does not need to be held while it runs.
    pub fn dispatch(&mut self, command: Command) -> Result<Option<Task>, DispatchError> {
        debug!("Dispatching {command:?}");
        match command {
            Command::SetQuery(query) => Ok(self.search.set_query(&query)),
            Command::SelectMovie(id) => Ok(self.select(id)),
            Command::CloseDetail => {
                self.close_detail();
                Ok(None)
            }
            Command::SetUserRating(rating) => {
                self.set_user_rating(rating)?;
                Ok(None)
            }
            Command::AddWatched => {
                self.add_watched()?;
                Ok(None)
            }
            Command::DeleteWatched(id) => {
                if !self.watched.remove(&id)? {
                    debug!("{id} was not in the watch list");
                }
                Ok(None)
            }
            Command::KeyPress(code) => self.key_press(&code),
        }
    }

    fn select(&mut self, id: ImdbId) -> Option<Task> {
        if self.detail.as_ref().map(|d| d.id == id).unwrap_or(false) {
            self.close_detail();
            return None;
        }

        // Drop the old view before binding keys for the new one
        self.detail = None;

        info!("Opening details for {id}");
        let mut slot = RequestSlot::default();
        let (ticket, registration) = slot.begin();
        let shared = Arc::new(Mutex::new(DetailState {
            movie: None,
            is_loading: true,
            error: String::new(),
        }));

        let pending = fail_on_abandon(Arc::clone(&shared), ticket.clone());
        let task: Task = Box::pin(run_details(
            Arc::clone(&self.indexer),
            Arc::clone(&shared),
            ticket,
            registration,
            pending,
            id.clone(),
        ));

        self.detail = Some(DetailView {
            id,
            shared,
            user_rating: None,
            rating_revisions: 0,
            _slot: slot,
            _close_binding: self.keyboard.bind(CLOSE_KEY, Command::CloseDetail),
        });

        Some(task)
    }

    fn close_detail(&mut self) {
        if let Some(detail) = self.detail.take() {
            info!("Closing details for {}", detail.id);
        }
    }

    fn set_user_rating(&mut self, rating: u8) -> Result<(), DispatchError> {
        if rating == 0 || rating > MAX_USER_RATING {
            return Err(DispatchError::InvalidRating(rating));
        }

        let detail = self.detail.as_mut().ok_or(DispatchError::NoDetailOpen)?;
        if detail.user_rating != Some(rating) {
            detail.user_rating = Some(rating);
            detail.rating_revisions += 1;
        }
        Ok(())
    }

    fn add_watched(&mut self) -> Result<(), DispatchError> {
        let detail = self.detail.as_ref().ok_or(DispatchError::NoDetailOpen)?;
        let movie = detail
            .state()
            .movie
            .ok_or(DispatchError::DetailNotLoaded)?;
        let user_rating = detail.user_rating.ok_or(DispatchError::NoRating)?;

        let entry = WatchedEntry::from_detail(&movie, user_rating, detail.rating_revisions);
        self.watched.add(entry)?;
        self.close_detail();
        Ok(())
    }

    fn key_press(&mut self, code: &str) -> Result<Option<Task>, DispatchError> {
        let mut tasks = Vec::new();
        for action in self.keyboard.press(code) {
            if let Some(task) = self.dispatch(action)? {
                tasks.push(task);
            }
        }

        if tasks.is_empty() {
            return Ok(None);
        }
        Ok(Some(future::join_all(tasks).map(|_| ()).boxed()))
    }
}

/// Marks the open view as failed if its request is dropped before settling, so
/// it does not wait on a request that will never finish.
fn fail_on_abandon(
    shared: Arc<Mutex<DetailState>>,
    ticket: Ticket,
) -> Unsettled<impl FnOnce() + Send> {
    Unsettled::new(move || {
        let mut state = shared.lock().expect("Poisoned lock");
        if !ticket.is_cancelled() {
            ticket.cancel();
            state.is_loading = false;
            state.error = ABANDONED_MESSAGE.to_string();
        }
    })
}

async fn run_details<I: MovieIndexer>(
    indexer: Arc<I>,
    shared: Arc<Mutex<DetailState>>,
    ticket: Ticket,
    registration: AbortRegistration,
    mut pending: Unsettled<impl FnOnce()>,
    id: ImdbId,
) {
    if ticket.is_cancelled() {
        return;
    }

    let outcome = Abortable::new(indexer.details(&id), registration).await;

    let mut state = shared.lock().expect("Poisoned lock");
    pending.settle();

    if ticket.is_cancelled() {
        debug!("Discarding details for closed view {id}");
        return;
    }

    match outcome {
        Ok(Ok(movie)) => {
            state.movie = Some(movie);
            state.error.clear();
        }
        Ok(Err(e)) => {
            warn!("Failed to get details for {id}: {e}");
            state.error = e.to_string();
        }
        Err(_) => return,
    }
    state.is_loading = false;
}
