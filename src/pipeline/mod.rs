//! Incoming message pipeline.
//!
//! Turns a received physical message into typed logical messages and hands
//! each one to the downstream stages:
//! ```text
//!   IncomingMessage
//!        │
//!   ┌────▼──────────────┐   EnclosedMessageTypesCache
//!   │ physical behaviors │          │
//!   └────┬──────────────┘          ▼
//!   ┌────▼──────────────────────────────┐
//!   │    DeserializeMessageConnector    │── DeserializerResolver
//!   └────┬──────────────────────────────┘
//!        │ 0..N, in order
//!   ┌────▼──────────────┐
//!   │ logical behaviors  │
//!   └────┬──────────────┘
//!        ▼
//!     terminal (handlers)
//! ```

pub mod context;
pub mod deserialize;
pub mod incoming;
pub mod stage;
pub mod type_cache;

pub use context::{
    IncomingLogicalMessageContext, IncomingPhysicalMessageContext, LogicalMessage,
    LogicalMessageFactory,
};
pub use deserialize::{DeserializeMessageConnector, TypeResolution};
pub use incoming::{IncomingPipeline, IncomingPipelineBuilder};
pub use stage::{Behavior, BehaviorChain, Next, NextFn, StageConnector};
pub use type_cache::{parse_enclosed_message_types, EnclosedMessageTypesCache, ResolvedTypes};
