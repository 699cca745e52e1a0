use crate::{
    indexer::MovieIndexer,
    types::{ImdbId, MovieDetail, MovieSummary},
};

use chrono::NaiveDate;
use futures::future::BoxFuture;
use isahc::{AsyncReadResponseExt, HttpClient};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::debug;

const OMDB_BASE_URI: &str = "https://www.omdbapi.com/";
const NOT_FOUND_MESSAGE: &str = "Movie not found!";

#[derive(Debug, Deserialize)]
struct OmdbStatus {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
}

impl OmdbStatus {
    fn succeeded(&self) -> bool {
        self.response.eq_ignore_ascii_case("true")
    }

    fn is_not_found(&self) -> bool {
        match &self.error {
            Some(message) => message == NOT_FOUND_MESSAGE,
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmdbSearchResult {
    #[serde(flatten)]
    status: OmdbStatus,
    #[serde(rename = "Search", default)]
    search: Vec<OmdbSearchItem>,
}

#[derive(Debug, Deserialize)]
struct OmdbSearchItem {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year")]
    year: String,
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Poster")]
    poster: String,
}

#[derive(Debug, Deserialize)]
struct OmdbMovie {
    #[serde(flatten)]
    status: OmdbStatus,
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Year", default)]
    year: String,
    #[serde(rename = "imdbID", default)]
    imdb_id: String,
    #[serde(rename = "Poster", default)]
    poster: String,
    #[serde(rename = "Plot", default)]
    plot: String,
    #[serde(rename = "imdbRating", default)]
    imdb_rating: String,
    #[serde(rename = "Runtime", default)]
    runtime: String,
    #[serde(rename = "Genre", default)]
    genre: String,
    #[serde(rename = "Actors", default)]
    actors: String,
    #[serde(rename = "Director", default)]
    director: String,
    #[serde(rename = "Released", default)]
    released: String,
}

impl From<OmdbSearchItem> for MovieSummary {
    fn from(value: OmdbSearchItem) -> Self {
        MovieSummary {
            imdb_id: ImdbId(value.imdb_id),
            title: value.title,
            year: value.year,
            poster: value.poster,
        }
    }
}

impl From<OmdbMovie> for MovieDetail {
    fn from(value: OmdbMovie) -> Self {
        // OMDb reports missing values as "N/A", which fails both parses
        let imdb_rating = value.imdb_rating.parse().ok();
        let released = NaiveDate::parse_from_str(&value.released, "%d %b %Y").ok();

        MovieDetail {
            imdb_id: ImdbId(value.imdb_id),
            title: value.title,
            year: value.year,
            poster: value.poster,
            plot: value.plot,
            imdb_rating,
            runtime: value.runtime,
            genre: value.genre,
            actors: value.actors,
            director: value.director,
            released,
        }
    }
}

#[derive(Debug, Error)]
pub enum OmdbError {
    #[error("failed to create http client")]
    CreateClient(#[source] isahc::Error),
    #[error("failed to reach the movie database")]
    Get(#[source] isahc::Error),
    #[error("something went wrong with fetching movies")]
    Status(isahc::http::StatusCode),
    #[error("failed to read response")]
    Read(#[source] std::io::Error),
    #[error("failed to parse json data")]
    Parse(#[source] serde_json::Error),
    #[error("movie not found")]
    NotFound,
    #[error("{0}")]
    Rejected(String),
}

pub struct OmdbIndexer {
    client: HttpClient,
    api_key: String,
}

impl OmdbIndexer {
    pub fn new(api_key: String) -> Result<OmdbIndexer, OmdbError> {
        let client = HttpClient::new().map_err(OmdbError::CreateClient)?;
        Ok(OmdbIndexer { client, api_key })
    }

    /// An empty list means OMDb reported no matches.
    pub async fn search(&self, query: &str) -> Result<Vec<MovieSummary>, OmdbError> {
        let api_response: OmdbSearchResult = self
            .request(&format!("s={}", urlencoding::encode(query)))
            .await?;
        search_results(api_response)
    }

    pub async fn get_by_id(&self, imdb_id: &ImdbId) -> Result<MovieDetail, OmdbError> {
        let api_response: OmdbMovie = self
            .request(&format!("i={}", urlencoding::encode(&imdb_id.0)))
            .await?;
        movie_detail(api_response)
    }

    async fn request<T: DeserializeOwned>(&self, params: &str) -> Result<T, OmdbError> {
        use OmdbError::*;

        let mut url = format!("{}?{}&apikey=", OMDB_BASE_URI, params);
        debug!("Sending request to {url}xxxxx");
        url.push_str(&self.api_key);

        let mut response = self.client.get_async(url).await.map_err(Get)?;
        if !response.status().is_success() {
            return Err(Status(response.status()));
        }

        let body_s = response.text().await.map_err(Read)?;

        debug!("Returned content {}", body_s);
        serde_json::from_str(&body_s).map_err(Parse)
    }
}

fn search_results(api_response: OmdbSearchResult) -> Result<Vec<MovieSummary>, OmdbError> {
    let status = &api_response.status;
    if !status.succeeded() {
        if status.is_not_found() {
            return Ok(Vec::new());
        }
        return Err(OmdbError::Rejected(
            status.error.clone().unwrap_or_default(),
        ));
    }

    Ok(api_response.search.into_iter().map(Into::into).collect())
}

fn movie_detail(api_response: OmdbMovie) -> Result<MovieDetail, OmdbError> {
    let status = &api_response.status;
    if !status.succeeded() {
        if status.is_not_found() {
            return Err(OmdbError::NotFound);
        }
        return Err(OmdbError::Rejected(
            status.error.clone().unwrap_or_default(),
        ));
    }

    Ok(api_response.into())
}

impl MovieIndexer for OmdbIndexer {
    type Err = OmdbError;

    fn search<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<Vec<MovieSummary>, OmdbError>> {
        Box::pin(OmdbIndexer::search(self, query))
    }

    fn details<'a>(&'a self, id: &'a ImdbId) -> BoxFuture<'a, Result<MovieDetail, OmdbError>> {
        Box::pin(self.get_by_id(id))
    }
}
