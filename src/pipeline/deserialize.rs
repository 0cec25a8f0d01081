//! Deserialization connector - physical message in, logical messages out.
//!
//! Per envelope:
//! 1. Control messages and empty bodies produce no logical messages.
//! 2. The enclosed-message-types header is resolved through the type cache.
//! 3. A deserializer is resolved from the headers and its canonical content
//!    type is written back onto the shared header map.
//! 4. The body is decoded and each object wrapped as a logical message.
//! 5. The next stage runs once per logical message, strictly in order.
//!
//! Failures in steps 2-4 surface as a single [`Error::MessageDeserialization`]
//! carrying the message id. Failures raised by the next stage propagate
//! untouched and stop the remaining fan-out; messages already dispatched are
//! not rolled back. Dropping the returned future has the same effect.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::context::{
    IncomingLogicalMessageContext, IncomingPhysicalMessageContext, LogicalMessage,
    LogicalMessageFactory,
};
use super::stage::{Next, StageConnector};
use super::type_cache::{EnclosedMessageTypesCache, ResolvedTypes};
use crate::envelope::{headers, IncomingMessage, MessageIntent};
use crate::observability::MESSAGE_TYPE_TAG;
use crate::registry::MessageMetadataLookup;
use crate::serialization::DeserializerResolver;
use crate::types::{Error, PipelineConfig, Result};

/// Outcome of resolving the target types of a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeResolution {
    /// Types declared by the sender and known to this endpoint.
    Declared(ResolvedTypes),
    /// Nothing usable was declared; the deserializer infers from the body.
    Infer,
    /// Nothing usable was declared and inference is disabled.
    Unresolvable { header: Option<String> },
}

pub struct DeserializeMessageConnector {
    deserializer_resolver: Arc<dyn DeserializerResolver>,
    logical_message_factory: LogicalMessageFactory,
    message_types: EnclosedMessageTypesCache,
    allow_content_type_inference: bool,
}

impl fmt::Debug for DeserializeMessageConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeserializeMessageConnector")
            .field("message_types", &self.message_types)
            .field(
                "allow_content_type_inference",
                &self.allow_content_type_inference,
            )
            .finish_non_exhaustive()
    }
}

impl DeserializeMessageConnector {
    pub fn new(
        deserializer_resolver: Arc<dyn DeserializerResolver>,
        logical_message_factory: LogicalMessageFactory,
        registry: Arc<dyn MessageMetadataLookup>,
        allow_content_type_inference: bool,
    ) -> Self {
        Self {
            deserializer_resolver,
            logical_message_factory,
            message_types: EnclosedMessageTypesCache::new(registry),
            allow_content_type_inference,
        }
    }

    pub fn from_config(
        config: &PipelineConfig,
        deserializer_resolver: Arc<dyn DeserializerResolver>,
        registry: Arc<dyn MessageMetadataLookup>,
    ) -> Self {
        Self::new(
            deserializer_resolver,
            LogicalMessageFactory::new(Arc::clone(&registry)),
            registry,
            config.allow_content_type_inference,
        )
    }

    /// Resolve the target types of `message`.
    pub fn resolve_message_types(&self, message: &IncomingMessage) -> Result<TypeResolution> {
        let enclosed = message.headers().get(headers::ENCLOSED_MESSAGE_TYPES);

        if let Some(value) = enclosed.as_deref() {
            let types = self.message_types.resolve(value)?;
            if !types.is_empty() {
                return Ok(TypeResolution::Declared(types));
            }

            if self.allow_content_type_inference
                && message.message_intent() != MessageIntent::Publish
            {
                tracing::warn!(
                    message_id = %message.id(),
                    enclosed_message_types = value,
                    "Could not determine message type from message header"
                );
            }
        }

        if self.allow_content_type_inference {
            Ok(TypeResolution::Infer)
        } else {
            Ok(TypeResolution::Unresolvable { header: enclosed })
        }
    }

    async fn extract_with_error_handling(
        &self,
        message: &IncomingMessage,
    ) -> Result<Vec<LogicalMessage>> {
        self.extract(message)
            .await
            .map_err(|source| Error::message_deserialization(message.id().clone(), source))
    }

    async fn extract(&self, message: &IncomingMessage) -> Result<Vec<LogicalMessage>> {
        // Older endpoints also put a body on control messages.
        if message.is_control_message() {
            tracing::debug!(
                message_id = %message.id(),
                "Received a control message. Skipping deserialization as control message data is contained in the header."
            );
            return Ok(Vec::new());
        }

        if message.body().is_empty() {
            tracing::debug!(
                message_id = %message.id(),
                "Received a message without body. Skipping deserialization."
            );
            return Ok(Vec::new());
        }

        let message_types: ResolvedTypes = match self.resolve_message_types(message)? {
            TypeResolution::Declared(types) => types,
            TypeResolution::Infer => Arc::from([]),
            TypeResolution::Unresolvable { header } => {
                return Err(Error::MessageTypeNotDetermined { header });
            }
        };

        let deserializer = self.deserializer_resolver.resolve(&message.headers().read())?;

        // Stages after this one rely on the content type being present.
        message
            .headers()
            .insert(headers::CONTENT_TYPE, deserializer.content_type());

        let decoded = deserializer
            .deserialize(message.body(), &message_types)
            .await?;

        decoded
            .into_iter()
            .map(|d| self.logical_message_factory.create(d.message_type, d.instance))
            .collect()
    }
}

#[async_trait]
impl StageConnector<IncomingPhysicalMessageContext, IncomingLogicalMessageContext>
    for DeserializeMessageConnector
{
    async fn invoke(
        &self,
        context: IncomingPhysicalMessageContext,
        next: &dyn Next<IncomingLogicalMessageContext>,
    ) -> Result<()> {
        let messages = self.extract_with_error_handling(context.message()).await?;

        let mut first = true;
        for message in messages {
            // Only the first message is tagged; multi-message bodies are legacy.
            if first {
                if let Some(tags) = context.metric_tags() {
                    tags.add(MESSAGE_TYPE_TAG, message.message_type().full_name());
                }
                first = false;
            }
            next.run(IncomingLogicalMessageContext::new(message, &context))
                .await?;
        }

        Ok(())
    }
}
