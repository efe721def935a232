//! Inference error types.

use thiserror::Error;

/// Errors from the inference engine or the reduction built on top of it.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine returned a non-success status code.
    #[error("engine API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The engine's response could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// The engine is not reachable or not serving; fatal at worker startup.
    #[error("inference engine unavailable: {0}")]
    Unavailable(String),

    /// A generation call failed inside the engine.
    #[error("generation failed: {0}")]
    Generation(String),
}
