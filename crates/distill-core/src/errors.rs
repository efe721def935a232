//! Cross-cutting error types for distill.
//!
//! This module defines errors that can originate from any crate in the system.
//! Domain-specific errors (e.g., `DatabaseError`, `InferenceError`) are defined in
//! their respective crates and converge in `distill-pipeline`.

use thiserror::Error;

/// Errors that can be raised by any distill crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Data failed validation (format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
