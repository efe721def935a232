//! Repository methods on [`PipelineStore`](crate::store::PipelineStore).

pub mod claim;
pub mod document;
pub mod metrics;
pub mod queue;
pub mod request;
pub mod summary;
pub mod sweep;
