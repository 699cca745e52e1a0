use futures::future::BoxFuture;

use std::error::Error;

use crate::types::{ImdbId, MovieDetail, MovieSummary};

/// Remote movie database. Returned futures are dropped to abort a request.
pub trait MovieIndexer: Send + Sync + 'static {
    type Err: Error + Send + 'static;

    fn search<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<Vec<MovieSummary>, Self::Err>>;
    fn details<'a>(&'a self, id: &'a ImdbId) -> BoxFuture<'a, Result<MovieDetail, Self::Err>>;
}
