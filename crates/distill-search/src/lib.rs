//! # distill-search
//!
//! The content-fetcher collaborator: given a topic, return ranked documents
//! with extracted text. [`SearxngFetcher`] queries a SearXNG instance and
//! fetches every result page.

mod error;
pub mod extract;
mod http;
pub mod searxng;

pub use error::FetchError;
pub use searxng::{SearchHit, SearxngFetcher};

use async_trait::async_trait;
use distill_core::entities::FetchedDocument;

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Up to `max_results` documents for `topic`, best first.
    ///
    /// Documents whose page could not be retrieved are still returned, with
    /// `content: None`.
    async fn fetch(&self, topic: &str, max_results: usize) -> Result<Vec<FetchedDocument>, FetchError>;
}
