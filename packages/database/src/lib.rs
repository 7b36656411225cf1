#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Database connection and incident queries for the incident map.
//!
//! Uses `switchy_database` raw parameterized queries against the
//! `incidents` table. Request filters are compiled into a [`Predicate`]
//! once and shared by the count and select statements.

pub mod db;
pub mod filter;
pub mod queries;
pub mod store;

pub use filter::{Binding, Predicate, compile};
pub use store::{DatabaseStore, IncidentStore};

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Connection setup error.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
