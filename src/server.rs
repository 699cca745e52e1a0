use futures::StreamExt;
use serde::Deserialize;
use tempfile::TempDir;
use thiserror::Error;
use tide::StatusCode;
use tracing::info;

use std::{fs::File, path::Path};

use crate::{
    app::App,
    indexer::MovieIndexer,
    session::{Command, DispatchError},
    store::KeyValueStore,
    types::ImdbId,
    watchlist::WatchListError,
};

#[derive(Error, Debug)]
pub enum ClientExtractionError {
    #[error("failed to create temp dir")]
    CreateDir(#[source] std::io::Error),
    #[error("failed to open tarball")]
    Open(#[source] std::io::Error),
    #[error("failed to unpack tarball")]
    Unpack(#[source] std::io::Error),
}

fn extract_client() -> Result<TempDir, ClientExtractionError> {
    use ClientExtractionError::*;
    let d = TempDir::new().map_err(CreateDir)?;
    let tarball_path = Path::new(env!("OUT_DIR")).join("client.tar");
    let tarball_reader = File::open(tarball_path).map_err(Open)?;
    let mut tarball = tar::Archive::new(tarball_reader);
    tarball.unpack(&d).map_err(Unpack)?;
    Ok(d)
}

fn dispatch_status(e: &DispatchError) -> StatusCode {
    match e {
        DispatchError::WatchList(WatchListError::Serialize(_))
        | DispatchError::WatchList(WatchListError::Persist(_)) => StatusCode::InternalServerError,
        _ => StatusCode::BadRequest,
    }
}

async fn dispatch<I: MovieIndexer, S: KeyValueStore>(
    app: &App<I, S>,
    command: Command,
) -> tide::Result<serde_json::Value> {
    match app.dispatch(command).await {
        Ok(view) => Ok(serde_json::to_value(view)?),
        Err(e) => Err(tide::Error::from_str(dispatch_status(&e), e.to_string())),
    }
}

async fn handle_view<I: MovieIndexer, S: KeyValueStore>(
    req: tide::Request<App<I, S>>,
) -> tide::Result<serde_json::Value> {
    Ok(serde_json::to_value(req.state().view())?)
}

async fn handle_search_events<I: MovieIndexer, S: KeyValueStore>(
    req: tide::Request<App<I, S>>,
    sender: tide::sse::Sender,
) -> tide::Result<()> {
    let mut updates = req.state().subscribe_search();
    while let Some(state) = updates.next().await {
        sender
            .send("search", serde_json::to_string(&state)?, None)
            .await?;
    }
    Ok(())
}

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

async fn handle_query<I: MovieIndexer, S: KeyValueStore>(
    mut req: tide::Request<App<I, S>>,
) -> tide::Result<serde_json::Value> {
    let request: QueryRequest = req.body_json().await?;
    dispatch(req.state(), Command::SetQuery(request.query)).await
}

#[derive(Deserialize)]
struct SelectRequest {
    id: ImdbId,
}

async fn handle_select<I: MovieIndexer, S: KeyValueStore>(
    mut req: tide::Request<App<I, S>>,
) -> tide::Result<serde_json::Value> {
    let request: SelectRequest = req.body_json().await?;
    dispatch(req.state(), Command::SelectMovie(request.id)).await
}

async fn handle_close<I: MovieIndexer, S: KeyValueStore>(
    req: tide::Request<App<I, S>>,
) -> tide::Result<serde_json::Value> {
    dispatch(req.state(), Command::CloseDetail).await
}

#[derive(Deserialize)]
struct RatingRequest {
    rating: u8,
}

async fn handle_rating<I: MovieIndexer, S: KeyValueStore>(
    mut req: tide::Request<App<I, S>>,
) -> tide::Result<serde_json::Value> {
    let request: RatingRequest = req.body_json().await?;
    dispatch(req.state(), Command::SetUserRating(request.rating)).await
}

async fn handle_add<I: MovieIndexer, S: KeyValueStore>(
    req: tide::Request<App<I, S>>,
) -> tide::Result<serde_json::Value> {
    dispatch(req.state(), Command::AddWatched).await
}

async fn handle_delete<I: MovieIndexer, S: KeyValueStore>(
    req: tide::Request<App<I, S>>,
) -> tide::Result<serde_json::Value> {
    let id = ImdbId(req.param("id")?.to_string());
    dispatch(req.state(), Command::DeleteWatched(id)).await
}

#[derive(Deserialize)]
struct KeyRequest {
    code: String,
}

async fn handle_key<I: MovieIndexer, S: KeyValueStore>(
    mut req: tide::Request<App<I, S>>,
) -> tide::Result<serde_json::Value> {
    let request: KeyRequest = req.body_json().await?;
    dispatch(req.state(), Command::KeyPress(request.code)).await
}

#[derive(Error, Debug)]
pub enum ServerCreationError {
    #[error("failed to extract client")]
    ExtractClient(#[from] ClientExtractionError),
    #[error("failed to serve directory")]
    ServeDir(#[source] std::io::Error),
}

pub struct Server<I, S> {
    app: tide::Server<App<I, S>>,
    _embedded_html_dir: TempDir,
}

impl<I: MovieIndexer, S: KeyValueStore> Server<I, S> {
    pub fn new(
        data_path: Option<&Path>,
        app: App<I, S>,
    ) -> Result<Server<I, S>, ServerCreationError> {
        let mut app = tide::with_state(app);
        let embedded_html_dir = extract_client()?;

        app.at("/").get(tide::Redirect::new("/index.html"));
        if let Some(data_path) = data_path {
            info!("Overriding embedded html with {}", data_path.display());
            app.at("/")
                .serve_dir(data_path)
                .map_err(ServerCreationError::ServeDir)?;
        } else {
            app.at("/")
                .serve_dir(&embedded_html_dir)
                .map_err(ServerCreationError::ServeDir)?;
        }

        app.at("/view").get(handle_view::<I, S>);
        app.at("/query").put(handle_query::<I, S>);
        app.at("/search/events")
            .get(tide::sse::endpoint(handle_search_events::<I, S>));
        app.at("/select").put(handle_select::<I, S>);
        app.at("/close").post(handle_close::<I, S>);
        app.at("/rating").put(handle_rating::<I, S>);
        app.at("/watched").post(handle_add::<I, S>);
        app.at("/watched/:id").delete(handle_delete::<I, S>);
        app.at("/key").post(handle_key::<I, S>);

        Ok(Server {
            app,
            _embedded_html_dir: embedded_html_dir,
        })
    }

    pub async fn serve(self, port: u16) -> std::io::Result<()> {
        info!("Serving on 127.0.0.1:{port}");
        self.app.listen(format!("127.0.0.1:{port}")).await
    }
}
