//! Incoming pipeline contexts and logical messages.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::envelope::{IncomingMessage, SharedHeaders};
use crate::observability::IncomingPipelineMetricTags;
use crate::registry::{MessageMetadata, MessageMetadataLookup, MessageType};
use crate::serialization::MessageInstance;
use crate::types::{MessageId, Result};

// =============================================================================
// Logical messages
// =============================================================================

/// A decoded object with its resolved type and metadata, ready for handler
/// dispatch.
#[derive(Clone)]
pub struct LogicalMessage {
    metadata: MessageMetadata,
    instance: MessageInstance,
}

impl LogicalMessage {
    pub fn message_type(&self) -> &MessageType {
        self.metadata.message_type()
    }

    pub fn metadata(&self) -> &MessageMetadata {
        &self.metadata
    }

    pub fn instance(&self) -> &MessageInstance {
        &self.instance
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }
}

impl fmt::Debug for LogicalMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicalMessage")
            .field("message_type", self.message_type())
            .finish_non_exhaustive()
    }
}

/// Builds logical messages, attaching registry metadata.
#[derive(Clone)]
pub struct LogicalMessageFactory {
    registry: Arc<dyn MessageMetadataLookup>,
}

impl fmt::Debug for LogicalMessageFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogicalMessageFactory").finish_non_exhaustive()
    }
}

impl LogicalMessageFactory {
    pub fn new(registry: Arc<dyn MessageMetadataLookup>) -> Self {
        Self { registry }
    }

    /// Wrap `instance` as a message of `message_type`. Types the registry
    /// does not know get metadata with a single-entry hierarchy.
    pub fn create(
        &self,
        message_type: MessageType,
        instance: MessageInstance,
    ) -> Result<LogicalMessage> {
        let metadata = self
            .registry
            .metadata_for(&message_type)?
            .unwrap_or_else(|| MessageMetadata::new(message_type));
        Ok(LogicalMessage { metadata, instance })
    }
}

// =============================================================================
// Contexts
// =============================================================================

/// Context of the physical (pre-deserialization) part of the pipeline.
#[derive(Debug, Clone)]
pub struct IncomingPhysicalMessageContext {
    message: IncomingMessage,
    metric_tags: Option<IncomingPipelineMetricTags>,
}

impl IncomingPhysicalMessageContext {
    pub fn new(message: IncomingMessage) -> Self {
        Self {
            message,
            metric_tags: None,
        }
    }

    pub fn with_metric_tags(mut self, metric_tags: IncomingPipelineMetricTags) -> Self {
        self.metric_tags = Some(metric_tags);
        self
    }

    pub fn message(&self) -> &IncomingMessage {
        &self.message
    }

    pub fn message_id(&self) -> &MessageId {
        self.message.id()
    }

    pub fn headers(&self) -> &SharedHeaders {
        self.message.headers()
    }

    pub fn metric_tags(&self) -> Option<&IncomingPipelineMetricTags> {
        self.metric_tags.as_ref()
    }
}

/// Context of the logical (post-deserialization) part of the pipeline.
/// One per logical message.
#[derive(Debug, Clone)]
pub struct IncomingLogicalMessageContext {
    message: LogicalMessage,
    message_id: MessageId,
    headers: SharedHeaders,
    metric_tags: Option<IncomingPipelineMetricTags>,
}

impl IncomingLogicalMessageContext {
    /// Derive a logical context from its physical parent; headers and
    /// metric tags stay shared with the parent.
    pub fn new(message: LogicalMessage, parent: &IncomingPhysicalMessageContext) -> Self {
        Self {
            message,
            message_id: parent.message_id().clone(),
            headers: parent.headers().clone(),
            metric_tags: parent.metric_tags.clone(),
        }
    }

    pub fn message(&self) -> &LogicalMessage {
        &self.message
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn headers(&self) -> &SharedHeaders {
        &self.headers
    }

    pub fn metric_tags(&self) -> Option<&IncomingPipelineMetricTags> {
        self.metric_tags.as_ref()
    }
}
