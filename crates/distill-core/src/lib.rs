//! # distill-core
//!
//! Core types, ID generation, and error types for the distill pipeline.
//!
//! This crate provides the foundational types shared across all distill crates:
//! - Entity structs for the request record and its children (documents, summary)
//! - The `Stage` state machine and the per-worker transition table
//! - The `RequestId` identity type
//! - The queue task envelope exchanged between stages
//! - Read-only projections consumed by dashboards and the CLI
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod messages;
pub mod responses;
