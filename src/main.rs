use server::Server;
use thiserror::Error;
use tracing::error;

use std::path::PathBuf;

use app::App;
use omdb::OmdbIndexer;
use store::SqliteStore;

mod app;
mod fetch;
mod indexer;
mod keys;
mod omdb;
mod search;
mod server;
mod session;
mod store;
mod summary;
#[cfg(test)]
mod test_util;
mod types;
mod view;
mod watchlist;

const API_KEY_ENV: &str = "OMDB_API_KEY";

#[derive(Error, Debug)]
enum ArgParseError {
    #[error("Unknown arg {0}")]
    UnknownArg(String),
    #[error("No port argument provided")]
    NoPort,
    #[error("Invalid port")]
    InvalidPort(#[source] std::num::ParseIntError),
    #[error("No db path argument provided")]
    NoDbPath,
    #[error("No api key provided, pass --api-key or set OMDB_API_KEY")]
    NoApiKey,
}

struct Args {
    html_path: Option<PathBuf>,
    port: u16,
    db_path: PathBuf,
    api_key: String,
}

impl Args {
    fn parse() -> Result<Args, ArgParseError> {
        let mut args = std::env::args();
        let _process_name = args.next();

        let mut html_path = None;
        let mut port = None;
        let mut db_path = None;
        let mut api_key = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--help" => {
                    println!("{}", Self::help());
                    std::process::exit(1);
                }
                "--html-path" => {
                    html_path = args.next().map(Into::into);
                }
                "--port" => {
                    port = args.next().map(|s| s.parse());
                }
                "--db-path" => db_path = args.next().map(Into::into),
                "--api-key" => api_key = args.next(),
                _ => {
                    return Err(ArgParseError::UnknownArg(arg));
                }
            }
        }

        let port = port
            .ok_or(ArgParseError::NoPort)?
            .map_err(ArgParseError::InvalidPort)?;

        let db_path = db_path.ok_or(ArgParseError::NoDbPath)?;

        let api_key = api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .ok_or(ArgParseError::NoApiKey)?;

        let ret = Args {
            html_path,
            port,
            db_path,
            api_key,
        };

        Ok(ret)
    }

    fn help() -> String {
        let process_name = std::env::args()
            .next()
            .unwrap_or_else(|| "popcorn".to_string());

        format!(
            "Search movies and keep a list of what you watched\n\
                \n\
                Usage: {process_name} [ARGS]\n\
                \n\
                Args:\n\
                --help: Show this help\n\
                --html-path: Optional path to filesystem to serve html files from. Useful for \
                debugging\n\
                --db-path: Path to the sqlite db holding the watch list\n\
                --api-key: OMDb api key, defaults to ${API_KEY_ENV}\n\
                --port: Port to serve UI on\n\
                "
        )
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = match Args::parse() {
        Ok(v) => v,
        Err(e) => {
            println!("{}", e);
            println!();
            println!("{}", Args::help());
            return;
        }
    };

    let indexer = match OmdbIndexer::new(args.api_key) {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to create movie indexer: {e}");
            return;
        }
    };

    let store = match SqliteStore::new(&args.db_path) {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to open {}: {e}", args.db_path.display());
            return;
        }
    };

    let app = App::new(indexer, store);
    let server = match Server::new(args.html_path.as_deref(), app) {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to create server: {e}");
            return;
        }
    };

    if let Err(e) = futures::executor::block_on(server.serve(args.port)) {
        error!("Server stopped: {e}");
    }
}
