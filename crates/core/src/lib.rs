//! Kublade domain core.
//!
//! Pure types and rules shared by the API server and the queue worker.
//! Nothing in this crate performs I/O except the in-memory job queue.

pub mod error;
pub mod jobs;
pub mod permission;
pub mod queue;
pub mod queue_status;
pub mod roles;
pub mod types;
pub mod validation;
