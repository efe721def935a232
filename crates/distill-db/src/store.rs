//! `PipelineStore`: the request store as seen by producers, workers and readers.
//!
//! Wraps a [`DistillDb`] handle. Repository methods live in [`crate::repos`]
//! as `impl PipelineStore` blocks, one file per concern.

use std::time::Duration;

use distill_config::DatabaseConfig;

use crate::DistillDb;
use crate::error::DatabaseError;

pub struct PipelineStore {
    db: DistillDb,
}

impl PipelineStore {
    /// Open the store described by the `[database]` config section.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or migrated.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        if config.is_in_memory() {
            tracing::warn!("in-memory store: requests are not shared between processes and are lost on exit");
            return Self::open_in_memory().await;
        }
        Self::open_local(&config.path, Duration::from_millis(config.busy_timeout_ms)).await
    }

    /// Open a store on a local file path.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or migrated.
    pub async fn open_local(path: &str, busy_timeout: Duration) -> Result<Self, DatabaseError> {
        let db = DistillDb::open_local(path, busy_timeout).await?;
        Ok(Self { db })
    }

    /// Open a private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if migrations fail.
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            db: DistillDb::open_in_memory().await?,
        })
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &DistillDb {
        &self.db
    }
}
