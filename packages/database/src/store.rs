//! The storage seam used by the HTTP layer.

use std::sync::Arc;

use async_trait::async_trait;
use incident_map_database_models::IncidentRow;
use switchy_database::Database;

use crate::DbError;
use crate::filter::Predicate;
use crate::queries;

/// Executes compiled incident predicates against a backing store.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Counts incidents matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store fails.
    async fn count(&self, predicate: &Predicate) -> Result<u64, DbError>;

    /// Returns at most `limit` matching incidents ordered by `occur_time`
    /// descending.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store fails.
    async fn select(
        &self,
        predicate: &Predicate,
        limit: u32,
    ) -> Result<Vec<IncidentRow>, DbError>;
}

/// [`IncidentStore`] backed by a shared `switchy_database` handle.
///
/// The handle is opened once at startup and reused by every request.
#[derive(Clone)]
pub struct DatabaseStore {
    db: Arc<dyn Database>,
}

impl DatabaseStore {
    /// Wraps an open database handle.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IncidentStore for DatabaseStore {
    async fn count(&self, predicate: &Predicate) -> Result<u64, DbError> {
        queries::count_incidents(self.db.as_ref(), predicate).await
    }

    async fn select(
        &self,
        predicate: &Predicate,
        limit: u32,
    ) -> Result<Vec<IncidentRow>, DbError> {
        queries::select_incidents(self.db.as_ref(), predicate, limit).await
    }
}
