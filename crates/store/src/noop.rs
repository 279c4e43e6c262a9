//! Relational store used when no database is configured.

use async_trait::async_trait;
use optimus_core::error::StoreError;
use optimus_core::store::{RelationalStore, Row};

/// Fails every query with a connection error, so `sql_fetch` reports an
/// upstream failure instead of the process refusing to start.
pub struct NoDatabase;

#[async_trait]
impl RelationalStore for NoDatabase {
    async fn fetch(&self, _sql: &str) -> Result<Vec<Row>, StoreError> {
        Err(StoreError::Connection("no database configured (set DATABASE_URL)".into()))
    }
}
