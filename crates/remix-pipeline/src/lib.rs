//! Remix job pipeline.
//!
//! This crate provides:
//! - The per-request job state machine ([`RemixOrchestrator`])
//! - Supervised delayed staging cleanup ([`DeferredCleanup`])
//! - Time-based garbage collection of working files ([`RetentionSweeper`])

pub mod cleanup;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod sweeper;

pub use cleanup::DeferredCleanup;
pub use config::PipelineConfig;
pub use error::{JobError, JobResult};
pub use logging::JobLogger;
pub use orchestrator::{RemixOrchestrator, ValidatedRequest};
pub use sweeper::{RetentionSweeper, SweepReport};
