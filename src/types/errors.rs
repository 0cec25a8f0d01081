//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

use super::MessageId;
use crate::envelope::headers;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the ingress pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Validation errors (bad configuration, malformed input).
    #[error("validation error: {0}")]
    Validation(String),

    /// Lookup failures that are reported rather than silently skipped.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal errors.
    #[error("internal error: {0}")]
    Internal(String),

    /// Failure raised by a downstream handler. Never wrapped by the
    /// deserialization stage.
    #[error("handler error: {0}")]
    Handler(String),

    /// No usable message type and body inference is disabled.
    #[error(
        "could not determine the message type from the '{}' header ({}) and message type inference from the message body has been disabled; ensure the header is set or enable message type inference",
        headers::ENCLOSED_MESSAGE_TYPES,
        .header.as_deref().unwrap_or("absent")
    )]
    MessageTypeNotDetermined { header: Option<String> },

    /// Any failure while extracting logical messages from a physical message.
    #[error("an error occurred while attempting to extract logical messages from incoming physical message {message_id}")]
    MessageDeserialization {
        message_id: MessageId,
        #[source]
        source: Box<Error>,
    },

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }

    pub fn message_deserialization(message_id: MessageId, source: Error) -> Self {
        Self::MessageDeserialization {
            message_id,
            source: Box::new(source),
        }
    }
}

impl Error {
    /// True for the wrapped deserialization-failure shape.
    pub fn is_deserialization_failure(&self) -> bool {
        matches!(self, Error::MessageDeserialization { .. })
    }

    /// True when the message type could not be determined, whether reported
    /// directly or inside a deserialization failure.
    pub fn is_message_type_not_determined(&self) -> bool {
        match self {
            Error::MessageTypeNotDetermined { .. } => true,
            Error::MessageDeserialization { source, .. } => source.is_message_type_not_determined(),
            _ => false,
        }
    }

    /// Id of the physical message a deserialization failure belongs to.
    pub fn message_id(&self) -> Option<&MessageId> {
        match self {
            Error::MessageDeserialization { message_id, .. } => Some(message_id),
            _ => None,
        }
    }

    /// The cause carried by a deserialization failure.
    pub fn deserialization_cause(&self) -> Option<&Error> {
        match self {
            Error::MessageDeserialization { source, .. } => Some(source),
            _ => None,
        }
    }
}
