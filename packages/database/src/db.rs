//! Database connection utilities.

use std::path::Path;

use switchy_database::Database;
use switchy_database_connection::{Credentials, init_sqlite_rusqlite};

use crate::DbError;

/// Opens a database connection from a connection URL.
///
/// `sqlite://<path>` opens a `SQLite` file. Anything else is treated as a
/// Postgres URL and connected over native TLS.
///
/// # Errors
///
/// Returns [`DbError::Connection`] if the URL cannot be parsed or the
/// connection fails.
pub async fn connect(url: &str) -> Result<Box<dyn Database>, DbError> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        log::debug!("Opening SQLite database at {path}");
        return init_sqlite_rusqlite(Some(Path::new(path))).map_err(|e| DbError::Connection {
            message: e.to_string(),
        });
    }

    let creds = Credentials::from_url(credentials_url(url)).map_err(|e| DbError::Connection {
        message: e.to_string(),
    })?;

    switchy_database_connection::init_postgres_raw_native_tls(creds)
        .await
        .map_err(|e| DbError::Connection {
            message: e.to_string(),
        })
}

/// The part of a Postgres URL that [`Credentials::from_url`] understands.
///
/// Query options such as `?sslmode=require` are dropped; the native TLS
/// connector is always used.
fn credentials_url(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}
