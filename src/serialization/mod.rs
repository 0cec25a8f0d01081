//! Body deserializers and their resolution by content type.
//!
//! A [`DeserializerResolver`] picks a [`MessageDeserializer`] from the
//! envelope headers; the deserializer turns the body plus the declared
//! target types into decoded objects.

use async_trait::async_trait;
use bytes::Bytes;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::envelope::{headers, Headers};
use crate::registry::MessageType;
use crate::types::{Error, PipelineConfig, Result};

pub mod json;

pub use json::JsonMessageDeserializer;

/// A decoded message object.
pub type MessageInstance = Arc<dyn Any + Send + Sync>;

/// One object decoded from a body, with the type the deserializer decoded it as.
#[derive(Clone)]
pub struct DecodedMessage {
    pub message_type: MessageType,
    pub instance: MessageInstance,
}

impl DecodedMessage {
    pub fn new<T: Any + Send + Sync>(message_type: MessageType, instance: T) -> Self {
        Self {
            message_type,
            instance: Arc::new(instance),
        }
    }
}

impl fmt::Debug for DecodedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedMessage")
            .field("message_type", &self.message_type)
            .finish_non_exhaustive()
    }
}

/// Decodes message bodies of one content type.
#[async_trait]
pub trait MessageDeserializer: Send + Sync {
    /// Canonical content type served by this deserializer.
    fn content_type(&self) -> &str;

    /// Decode `body` into zero or more objects.
    ///
    /// `message_types` is ordered most specific first. An empty slice asks
    /// the deserializer to infer the type from the body.
    async fn deserialize(
        &self,
        body: &Bytes,
        message_types: &[MessageType],
    ) -> Result<Vec<DecodedMessage>>;
}

/// Selects the deserializer for an envelope from its headers.
pub trait DeserializerResolver: Send + Sync {
    fn resolve(&self, headers: &Headers) -> Result<Arc<dyn MessageDeserializer>>;
}

/// Media type of a content-type value, without parameters, lowercased.
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Resolves by the content-type header, falling back to a default
/// deserializer when the header is absent or names an unknown type.
pub struct ContentTypeDeserializerResolver {
    default: Arc<dyn MessageDeserializer>,
    by_content_type: HashMap<String, Arc<dyn MessageDeserializer>>,
}

impl ContentTypeDeserializerResolver {
    pub fn new(default: Arc<dyn MessageDeserializer>) -> Self {
        let mut by_content_type = HashMap::new();
        by_content_type.insert(media_type(default.content_type()), Arc::clone(&default));
        Self {
            default,
            by_content_type,
        }
    }

    /// Resolver whose default is the deserializer serving
    /// `config.default_content_type`. The first deserializer listed for a
    /// content type wins.
    pub fn from_config(
        config: &PipelineConfig,
        deserializers: impl IntoIterator<Item = Arc<dyn MessageDeserializer>>,
    ) -> Result<Self> {
        let mut by_content_type: HashMap<String, Arc<dyn MessageDeserializer>> = HashMap::new();
        for deserializer in deserializers {
            by_content_type
                .entry(media_type(deserializer.content_type()))
                .or_insert(deserializer);
        }

        let default = by_content_type
            .get(&media_type(&config.default_content_type))
            .cloned()
            .ok_or_else(|| {
                Error::validation(format!(
                    "no deserializer serves the default content type '{}'",
                    config.default_content_type
                ))
            })?;

        Ok(Self {
            default,
            by_content_type,
        })
    }

    /// Add another deserializer. The first one registered for a content
    /// type wins.
    pub fn with_deserializer(mut self, deserializer: Arc<dyn MessageDeserializer>) -> Self {
        self.by_content_type
            .entry(media_type(deserializer.content_type()))
            .or_insert(deserializer);
        self
    }

    pub fn default_content_type(&self) -> &str {
        self.default.content_type()
    }
}

impl fmt::Debug for ContentTypeDeserializerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut content_types: Vec<&String> = self.by_content_type.keys().collect();
        content_types.sort();
        f.debug_struct("ContentTypeDeserializerResolver")
            .field("default", &self.default.content_type())
            .field("content_types", &content_types)
            .finish()
    }
}

impl DeserializerResolver for ContentTypeDeserializerResolver {
    fn resolve(&self, headers: &Headers) -> Result<Arc<dyn MessageDeserializer>> {
        let Some(content_type) = headers.get(headers::CONTENT_TYPE) else {
            return Ok(Arc::clone(&self.default));
        };

        match self.by_content_type.get(&media_type(content_type)) {
            Some(deserializer) => Ok(Arc::clone(deserializer)),
            None => {
                tracing::warn!(
                    content_type = %content_type,
                    fallback = %self.default.content_type(),
                    "No deserializer registered for content type, using the default deserializer"
                );
                Ok(Arc::clone(&self.default))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MessageMetadataRegistry;
    use tracing_test::traced_test;

    #[derive(Debug)]
    struct FixedDeserializer(&'static str);

    #[async_trait]
    impl MessageDeserializer for FixedDeserializer {
        fn content_type(&self) -> &str {
            self.0
        }

        async fn deserialize(
            &self,
            _body: &Bytes,
            _message_types: &[MessageType],
        ) -> Result<Vec<DecodedMessage>> {
            Ok(Vec::new())
        }
    }

    fn resolver() -> ContentTypeDeserializerResolver {
        let registry = Arc::new(MessageMetadataRegistry::new());
        ContentTypeDeserializerResolver::new(Arc::new(JsonMessageDeserializer::new(registry)))
            .with_deserializer(Arc::new(FixedDeserializer("application/xml")))
    }

    fn headers_with_content_type(value: &str) -> Headers {
        let mut headers = Headers::new();
        headers.insert(headers::CONTENT_TYPE.to_string(), value.to_string());
        headers
    }

    #[test]
    fn test_absent_content_type_uses_default() {
        let resolved = resolver().resolve(&Headers::new()).unwrap();
        assert_eq!(resolved.content_type(), "application/json");
    }

    #[test]
    fn test_known_content_type_ignores_case_and_parameters() {
        let resolved = resolver()
            .resolve(&headers_with_content_type("Application/XML; charset=utf-8"))
            .unwrap();
        assert_eq!(resolved.content_type(), "application/xml");
    }

    #[traced_test]
    #[test]
    fn test_unknown_content_type_falls_back_with_warning() {
        let resolved = resolver()
            .resolve(&headers_with_content_type("application/x-protobuf"))
            .unwrap();
        assert_eq!(resolved.content_type(), "application/json");
        assert!(logs_contain("No deserializer registered for content type"));
    }

    #[test]
    fn test_first_registration_wins() {
        let json: Arc<dyn MessageDeserializer> = Arc::new(JsonMessageDeserializer::new(Arc::new(
            MessageMetadataRegistry::new(),
        )));
        let resolver = ContentTypeDeserializerResolver::new(Arc::clone(&json))
            .with_deserializer(Arc::new(FixedDeserializer("application/json")));

        let resolved = resolver
            .resolve(&headers_with_content_type("application/json"))
            .unwrap();
        assert!(std::ptr::eq(
            Arc::as_ptr(&resolved) as *const (),
            Arc::as_ptr(&json) as *const ()
        ));
        assert_eq!(resolver.default_content_type(), "application/json");
    }

    fn deserializers() -> Vec<Arc<dyn MessageDeserializer>> {
        let json: Arc<dyn MessageDeserializer> = Arc::new(JsonMessageDeserializer::new(Arc::new(
            MessageMetadataRegistry::new(),
        )));
        let xml: Arc<dyn MessageDeserializer> = Arc::new(FixedDeserializer("application/xml"));
        vec![json, xml]
    }

    #[test]
    fn test_from_config_uses_configured_default() {
        let config = PipelineConfig {
            default_content_type: "Application/XML; charset=utf-8".to_string(),
            ..Default::default()
        };
        let resolver =
            ContentTypeDeserializerResolver::from_config(&config, deserializers()).unwrap();

        assert_eq!(resolver.default_content_type(), "application/xml");
        let resolved = resolver.resolve(&Headers::new()).unwrap();
        assert_eq!(resolved.content_type(), "application/xml");
        let resolved = resolver
            .resolve(&headers_with_content_type("application/json"))
            .unwrap();
        assert_eq!(resolved.content_type(), "application/json");
    }

    #[test]
    fn test_from_config_without_matching_deserializer_fails() {
        let config = PipelineConfig {
            default_content_type: "application/x-protobuf".to_string(),
            ..Default::default()
        };
        let err =
            ContentTypeDeserializerResolver::from_config(&config, deserializers()).unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ref msg) if msg.contains("application/x-protobuf")
        ));
    }
}
