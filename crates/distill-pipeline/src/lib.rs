//! # distill-pipeline
//!
//! Moves requests through the stages:
//! - [`Submitter`] creates a request and queues its search task
//! - [`Worker`] runs one [`StageHandler`] ([`SearchStage`] or
//!   [`AnalysisStage`]) against a [`TaskQueue`]
//!
//! Exactly-once stage execution comes from the store's claim, not from the
//! queue: a duplicate or stale delivery fails to claim and is committed as
//! [`Outcome::Skipped`]. A request whose next task was never published is
//! forwarded again by a later delivery or by [`requeue_stranded`].

mod error;
pub mod queue;
pub mod recovery;
pub mod stages;
pub mod submit;
pub mod worker;

pub use error::PipelineError;
pub use queue::{Delivery, InMemoryQueue, StoreQueue, TaskQueue};
pub use recovery::requeue_stranded;
pub use stages::{AnalysisStage, SearchStage, StageHandler};
pub use submit::Submitter;
pub use worker::{Outcome, Worker};
