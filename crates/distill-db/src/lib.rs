//! # distill-db
//!
//! libSQL request store for the distill pipeline.
//!
//! Holds every request with its current stage, the documents gathered for it
//! and its final summary. Workers coordinate exclusively through this store:
//! the claim protocol in [`repos::claim`] is a single conditional `UPDATE`
//! that moves a request into its in-progress stage, so a duplicate delivery
//! finds nothing to update and backs off without waiting on any lock.
//!
//! The same database also carries the durable stage queue
//! ([`repos::queue`]), which lets a single file back a whole deployment.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod store;

#[cfg(test)]
mod test_support;

use std::time::Duration;

use libsql::Builder;

pub use error::DatabaseError;
pub use repos::queue::QueuedMessage;
pub use store::PipelineStore;

/// Database handle: one libSQL database and one connection to it.
///
/// Open one handle per worker. Transactions are connection-scoped, so a
/// handle must not be shared between tasks that write concurrently.
pub struct DistillDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl DistillDb {
    /// Open a local database file (or `":memory:"`) and run migrations.
    ///
    /// File databases are switched to WAL so readers never block the single
    /// writer, and every connection waits up to `busy_timeout` for the write
    /// lock before reporting the database as busy.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str, busy_timeout: Duration) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // PRAGMAs that report a value must go through query(), not execute().
        let busy_ms = busy_timeout.as_millis();
        conn.query(&format!("PRAGMA busy_timeout = {busy_ms}"), ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA busy_timeout: {e}")))?;
        if path != ":memory:" {
            conn.query("PRAGMA journal_mode = WAL", ())
                .await
                .map_err(|e| DatabaseError::Migration(format!("PRAGMA journal_mode: {e}")))?;
        }

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let distill_db = Self { db, conn };
        distill_db.run_migrations().await?;
        tracing::debug!(path, busy_ms, "request store opened");
        Ok(distill_db)
    }

    /// Open a private in-memory database (tests, dry runs).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if migrations fail.
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::open_local(":memory:", Duration::ZERO).await
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }
}
