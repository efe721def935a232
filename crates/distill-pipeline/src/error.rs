//! Pipeline error types.
//!
//! Errors from every collaborator converge here. What a worker does with a
//! failed delivery depends on [`PipelineError::is_infrastructure`].

use distill_core::errors::CoreError;
use distill_db::DatabaseError;
use distill_inference::InferenceError;
use distill_search::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Error from the request store.
    #[error("store error: {0}")]
    Store(#[from] DatabaseError),

    /// The stage queue could not publish, deliver or commit.
    #[error("queue error: {0}")]
    Queue(String),

    /// The content fetcher failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The inference engine failed.
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),

    /// Validation or encoding error from core types.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PipelineError {
    /// Store and queue faults: nothing durable can be recorded for the
    /// request, so the triggering message must stay unacknowledged.
    ///
    /// A store rejecting a write as invalid for the request's state is a
    /// per-request fault, not an infrastructure one.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        match self {
            Self::Store(DatabaseError::InvalidState(_)) => false,
            Self::Store(_) | Self::Queue(_) => true,
            Self::Fetch(_) | Self::Inference(_) | Self::Core(_) => false,
        }
    }
}
