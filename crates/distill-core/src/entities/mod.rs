//! Entity structs for the distill data model.
//!
//! Each entity maps to a table in the libSQL store. A `Request` owns many
//! `GatheredDocument`s and at most one `SummaryResult`; children are removed
//! together with their parent.

mod document;
mod request;
mod summary;

pub use document::{FetchedDocument, GatheredDocument};
pub use request::Request;
pub use summary::SummaryResult;
