use serde::Serialize;

use crate::{
    indexer::MovieIndexer,
    session::Session,
    store::KeyValueStore,
    summary::WatchSummary,
    types::{ImdbId, MovieDetail, MovieSummary, WatchedEntry},
};

pub const APP_TITLE: &str = "usePopcorn";

/// Everything the client needs to draw one frame.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub title: String,
    pub query: String,
    pub num_results: usize,
    pub results: ResultsPane,
    pub detail: Option<DetailPane>,
    pub watched: Option<WatchedPane>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultsPane {
    Loading,
    Error { message: String },
    Movies { movies: Vec<MovieSummary> },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetailStatus {
    Loading,
    Error { message: String },
    Loaded { movie: MovieDetail },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DetailPane {
    pub id: ImdbId,
    pub status: DetailStatus,
    pub user_rating: Option<u8>,
    pub rating_revisions: u32,
    /// Set when the movie is already in the watch list
    pub watched_rating: Option<u8>,
    pub can_add: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WatchedPane {
    pub summary: WatchSummary,
    pub movies: Vec<WatchedEntry>,
}

impl ViewModel {
    pub fn new<I: MovieIndexer, S: KeyValueStore>(session: &Session<I, S>) -> ViewModel {
        let search = session.search_state();
        let watch_list = session.watch_list();

        let results = if search.is_loading {
            ResultsPane::Loading
        } else if !search.error.is_empty() {
            ResultsPane::Error {
                message: search.error,
            }
        } else {
            ResultsPane::Movies {
                movies: search.movies.clone(),
            }
        };

        let mut title = APP_TITLE.to_string();
        let detail = session.detail().map(|detail| {
            let state = detail.state();
            let watched_rating = watch_list.get(detail.id()).map(|e| e.user_rating);

            let status = if state.is_loading {
                DetailStatus::Loading
            } else if !state.error.is_empty() {
                DetailStatus::Error {
                    message: state.error,
                }
            } else {
                match state.movie {
                    Some(movie) => {
                        title = format!("Movie {}", movie.title);
                        DetailStatus::Loaded { movie }
                    }
                    None => DetailStatus::Loading,
                }
            };

            let can_add = matches!(status, DetailStatus::Loaded { .. })
                && watched_rating.is_none()
                && detail.user_rating().is_some();

            DetailPane {
                id: detail.id().clone(),
                status,
                user_rating: detail.user_rating(),
                rating_revisions: detail.rating_revisions(),
                watched_rating,
                can_add,
            }
        });

        let watched = match detail {
            Some(_) => None,
            None => Some(WatchedPane {
                summary: watch_list.summary(),
                movies: watch_list.entries().to_vec(),
            }),
        };

        ViewModel {
            title,
            query: search.query,
            num_results: search.movies.len(),
            results,
            detail,
            watched,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use futures::executor::block_on;
    use std::sync::Arc;

    use crate::{
        session::{Command, ABANDONED_MESSAGE},
        store::MemoryStore,
        test_util::{detail, matrix_results, FakeError, FakeIndexer},
    };

    fn session() -> (Arc<FakeIndexer>, Session<FakeIndexer, MemoryStore>) {
        let indexer = Arc::new(FakeIndexer::default());
        let session = Session::new(Arc::clone(&indexer), MemoryStore::default());
        (indexer, session)
    }

    #[test]
    fn test_initial_view() {
        let (_indexer, session) = session();
        let view = ViewModel::new(&session);

        assert_eq!(view.title, APP_TITLE);
        assert_eq!(view.num_results, 0);
        assert_eq!(view.results, ResultsPane::Movies { movies: Vec::new() });
        assert!(view.detail.is_none());

        let watched = view.watched.expect("Expected the watch list");
        assert_eq!(watched.summary.count, 0);
        assert_eq!(watched.summary.avg_runtime, None);
    }

    #[test]
    fn test_loading_takes_precedence() {
        let (indexer, mut session) = session();
        let _reply = indexer.expect_search("Matrix");
        let _task = session
            .dispatch(Command::SetQuery("Matrix".to_string()))
            .expect("Failed to dispatch");

        let view = ViewModel::new(&session);
        assert_eq!(view.results, ResultsPane::Loading);
        assert_eq!(view.query, "Matrix");
    }

    #[test]
    fn test_error_takes_precedence_over_results() {
        let (indexer, mut session) = session();

        let reply = indexer.expect_search("Matrix");
        let task = session
            .dispatch(Command::SetQuery("Matrix".to_string()))
            .expect("Failed to dispatch")
            .expect("Expected a search request");
        reply.send(Ok(matrix_results())).expect("Failed to send reply");
        block_on(task);

        let reply = indexer.expect_search("Matrix 4");
        let task = session
            .dispatch(Command::SetQuery("Matrix 4".to_string()))
            .expect("Failed to dispatch")
            .expect("Expected a search request");
        reply.send(Err(FakeError::Network)).expect("Failed to send reply");
        block_on(task);

        let view = ViewModel::new(&session);
        assert_eq!(
            view.results,
            ResultsPane::Error {
                message: "network unreachable".to_string()
            }
        );
        assert_eq!(view.num_results, 3);
    }

    #[test]
    fn test_abandoned_detail_shows_error() {
        let (_indexer, mut session) = session();
        let task = session
            .dispatch(Command::SelectMovie(ImdbId("tt0133093".to_string())))
            .expect("Failed to dispatch")
            .expect("Expected a detail request");
        drop(task);

        let view = ViewModel::new(&session);
        let pane = view.detail.expect("Expected a detail pane");
        assert_eq!(
            pane.status,
            DetailStatus::Error {
                message: ABANDONED_MESSAGE.to_string()
            }
        );
        assert!(!pane.can_add);
    }

    #[test]
    fn test_detail_view() {
        let (indexer, mut session) = session();
        let id = ImdbId("tt0133093".to_string());
        let reply = indexer.expect_details(&id);
        let task = session
            .dispatch(Command::SelectMovie(id.clone()))
            .expect("Failed to dispatch")
            .expect("Expected a detail request");

        let view = ViewModel::new(&session);
        let pane = view.detail.expect("Expected a detail pane");
        assert_eq!(pane.status, DetailStatus::Loading);
        assert!(view.watched.is_none());
        assert_eq!(view.title, APP_TITLE);

        reply
            .send(Ok(detail("tt0133093", "The Matrix")))
            .expect("Failed to send reply");
        block_on(task);
        session
            .dispatch(Command::SetUserRating(8))
            .expect("Failed to dispatch");

        let view = ViewModel::new(&session);
        assert_eq!(view.title, "Movie The Matrix");
        let pane = view.detail.expect("Expected a detail pane");
        assert!(pane.can_add);
        assert_eq!(pane.user_rating, Some(8));
        assert_eq!(pane.watched_rating, None);

        session
            .dispatch(Command::AddWatched)
            .expect("Failed to dispatch");
        let view = ViewModel::new(&session);
        assert_eq!(view.title, APP_TITLE);
        let watched = view.watched.expect("Expected the watch list");
        assert_eq!(watched.summary.count, 1);
        assert_eq!(watched.summary.avg_user_rating, Some(8.0));
        assert_eq!(watched.summary.avg_runtime, Some(136.0));
    }

    #[test]
    fn test_watched_movie_shows_rating() {
        let (indexer, mut session) = session();
        let id = ImdbId("tt0133093".to_string());

        for _ in 0..2 {
            let reply = indexer.expect_details(&id);
            let task = session
                .dispatch(Command::SelectMovie(id.clone()))
                .expect("Failed to dispatch")
                .expect("Expected a detail request");
            reply
                .send(Ok(detail("tt0133093", "The Matrix")))
                .expect("Failed to send reply");
            block_on(task);
            if session.watch_list().entries().is_empty() {
                session
                    .dispatch(Command::SetUserRating(6))
                    .expect("Failed to dispatch");
                session
                    .dispatch(Command::AddWatched)
                    .expect("Failed to dispatch");
            }
        }

        let view = ViewModel::new(&session);
        let pane = view.detail.expect("Expected a detail pane");
        assert_eq!(pane.watched_rating, Some(6));
        assert!(!pane.can_add);
    }

    #[test]
    fn test_serialized_shape() {
        let (_indexer, session) = session();
        let value =
            serde_json::to_value(ViewModel::new(&session)).expect("Failed to serialize view");
        assert_eq!(value["results"]["kind"], "movies");
        assert_eq!(value["watched"]["summary"]["avg_imdb_rating"], serde_json::Value::Null);
    }
}
