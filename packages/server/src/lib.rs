#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the incident map.
//!
//! Serves filtered, capped incident listings and counts from the
//! `incidents` table. Every request compiles its query string into a single
//! parameterized predicate that drives both the count and the select, so
//! the reported total always describes the rows returned.

pub mod config;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use incident_map_database::{DatabaseStore, DbError, IncidentStore, db};

pub use config::{ConfigError, ServerConfig};

/// Shared application state.
pub struct AppState {
    /// Incident storage, opened once at startup.
    pub store: Arc<dyn IncidentStore>,
}

/// Errors that stop the server from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The database could not be opened.
    #[error(transparent)]
    Database(#[from] DbError),

    /// The HTTP server failed to bind or run.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::QueryConfig::default().error_handler(handlers::query_rejected))
            .route("/health", web::get().to(handlers::health))
            .route("/incidents/count", web::get().to(handlers::incidents_count))
            .route("/incidents", web::get().to(handlers::incidents)),
    );
}

/// Builds the CORS middleware for the configured origins.
///
/// A `*` entry allows any origin.
fn cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "OPTIONS"])
        .allow_any_header()
        .max_age(3600);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_any_origin();
    }

    origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

fn init_logger(config: &ServerConfig) {
    if std::env::var_os("RUST_LOG").is_some() {
        pretty_env_logger::init_custom_env("RUST_LOG");
    } else {
        pretty_env_logger::formatted_builder()
            .filter_level(if config.debug {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            })
            .init();
    }
}

/// Starts the incident map API server.
///
/// Loads `.env` (if present) and the environment configuration, connects
/// to the database, and serves the API until shutdown. The caller provides
/// the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if configuration is invalid, the database
/// connection fails, or the HTTP server fails to bind or run.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), ServerError> {
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;
    init_logger(&config);

    log::info!("Environment: {}", config.env);
    log::info!("Connecting to database...");
    let db_conn = db::connect(&config.database_url).await?;

    let state = web::Data::new(AppState {
        store: Arc::new(DatabaseStore::new(Arc::from(db_conn))),
    });

    log::info!(
        "Starting server on {}:{} (CORS origins: {})",
        config.bind_addr,
        config.port,
        config.cors_origins.join(", ")
    );

    let origins = config.cors_origins.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&origins))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.clone(), config.port))?
    .run()
    .await?;

    Ok(())
}
