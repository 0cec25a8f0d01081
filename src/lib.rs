//! # Ingress Core - incoming message deserialization
//!
//! The stage of a message-bus receive pipeline that turns an opaque received
//! message (headers + raw body) into typed logical messages:
//! - Header-driven type resolution with legacy wire-format compatibility
//! - Content-type based selection of a pluggable body deserializer
//! - Lock-free caching of parsed type headers under concurrent load
//! - Ordered fan-out of one envelope into several logical messages
//! - A single wrapped failure type for everything that goes wrong while decoding
//!
//! ## Architecture
//!
//! ```text
//!   transport ──► IncomingPipeline ──► physical behaviors
//!                                         │
//!                          DeserializeMessageConnector ◄── registry / deserializers
//!                                         │ 0..N logical messages
//!                                   logical behaviors ──► handlers
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod envelope;
pub mod pipeline;
pub mod registry;
pub mod serialization;
pub mod types;

// Internal utilities
pub mod observability;

pub use types::{Config, Error, MessageId, Result};
