//! Core types for the ingress pipeline.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (MessageId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for the pipeline and observability

mod config;
mod errors;
mod ids;

pub use config::{
    Config, ObservabilityConfig, PipelineConfig, ENV_ALLOW_CONTENT_TYPE_INFERENCE,
    ENV_DEFAULT_CONTENT_TYPE, ENV_LOG_FORMAT, ENV_LOG_LEVEL,
};
pub use errors::{Error, Result};
pub use ids::MessageId;
