//! Shared data models for the audio remix service.
//!
//! This crate provides Serde-serializable types for:
//! - The fixed effect catalog and its filter directives
//! - Remix jobs, identifiers and pipeline stages
//! - Output audio encoding settings
//! - Request/response schemas of the remix endpoint

pub mod effect;
pub mod encoding;
pub mod job;
pub mod remix;

// Re-export common types
pub use effect::{
    serialize_chain, EffectCatalog, EffectDefinition, EffectSummary, FilterDirective, ParamValue,
    DEFAULT_EFFECT,
};
pub use encoding::AudioEncoding;
pub use job::{Job, JobId, JobStage, RemixOutcome};
pub use remix::{format_file_size, format_processing_time, RemixRequest, RemixResponse};
