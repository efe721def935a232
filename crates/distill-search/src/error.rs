//! Fetch error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The search backend returned a non-success status code.
    #[error("search API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The search response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}
