//! JSON body deserializer.
//!
//! Bodies decode to `serde_json::Value` instances. A top-level array is the
//! legacy multi-payload form and yields one message per element.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;

use super::{DecodedMessage, MessageDeserializer};
use crate::registry::{MessageMetadataLookup, MessageType};
use crate::types::{Error, Result};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Property naming the type of a JSON payload when no type was declared.
pub const TYPE_PROPERTY: &str = "$type";

/// Deserializer for `application/json` bodies.
pub struct JsonMessageDeserializer {
    registry: Arc<dyn MessageMetadataLookup>,
}

impl std::fmt::Debug for JsonMessageDeserializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonMessageDeserializer").finish_non_exhaustive()
    }
}

impl JsonMessageDeserializer {
    pub fn new(registry: Arc<dyn MessageMetadataLookup>) -> Self {
        Self { registry }
    }

    fn infer_type(&self, payload: &Value) -> Result<MessageType> {
        let type_name = payload
            .get(TYPE_PROPERTY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::validation(format!(
                    "cannot infer message type: payload has no '{}' property",
                    TYPE_PROPERTY
                ))
            })?;

        self.registry
            .lookup(type_name)?
            .map(|metadata| metadata.message_type().clone())
            .ok_or_else(|| {
                Error::not_found(format!("no message type registered for '{}'", type_name))
            })
    }

    fn decode_one(&self, payload: Value, message_types: &[MessageType]) -> Result<DecodedMessage> {
        let message_type = match message_types.first() {
            Some(declared) => declared.clone(),
            None => self.infer_type(&payload)?,
        };
        Ok(DecodedMessage::new(message_type, payload))
    }
}

#[async_trait]
impl MessageDeserializer for JsonMessageDeserializer {
    fn content_type(&self) -> &str {
        JSON_CONTENT_TYPE
    }

    async fn deserialize(
        &self,
        body: &Bytes,
        message_types: &[MessageType],
    ) -> Result<Vec<DecodedMessage>> {
        match serde_json::from_slice::<Value>(body)? {
            Value::Array(payloads) => payloads
                .into_iter()
                .map(|payload| self.decode_one(payload, message_types))
                .collect(),
            payload => Ok(vec![self.decode_one(payload, message_types)?]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MessageMetadataRegistry;
    use serde_json::json;

    fn deserializer() -> (JsonMessageDeserializer, MessageType) {
        let registry = Arc::new(MessageMetadataRegistry::new());
        let order_placed = registry.register_type("Sales.OrderPlaced");
        (JsonMessageDeserializer::new(registry), order_placed)
    }

    fn value_of(decoded: &DecodedMessage) -> &Value {
        decoded.instance.downcast_ref::<Value>().unwrap()
    }

    #[tokio::test]
    async fn test_declared_type_is_used() {
        let (deserializer, order_placed) = deserializer();
        let body = Bytes::from_static(br#"{"order_id":42}"#);

        let decoded = deserializer
            .deserialize(&body, &[order_placed.clone()])
            .await
            .unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].message_type, order_placed);
        assert_eq!(value_of(&decoded[0]), &json!({"order_id": 42}));
    }

    #[tokio::test]
    async fn test_infers_type_from_type_property() {
        let (deserializer, order_placed) = deserializer();
        let body = Bytes::from_static(
            br#"{"$type":"Sales.OrderPlaced, Sales.Messages","order_id":1}"#,
        );

        let decoded = deserializer.deserialize(&body, &[]).await.unwrap();
        assert_eq!(decoded[0].message_type, order_placed);
    }

    #[tokio::test]
    async fn test_inference_without_type_property_fails() {
        let (deserializer, _) = deserializer();
        let body = Bytes::from_static(br#"{"order_id":1}"#);

        let err = deserializer.deserialize(&body, &[]).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_inference_of_unknown_type_fails() {
        let (deserializer, _) = deserializer();
        let body = Bytes::from_static(br#"{"$type":"Sales.Unknown"}"#);

        let err = deserializer.deserialize(&body, &[]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_array_body_yields_message_per_element() {
        let (deserializer, order_placed) = deserializer();
        let body = Bytes::from_static(br#"[{"n":1},{"n":2}]"#);

        let decoded = deserializer.deserialize(&body, &[order_placed]).await.unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(value_of(&decoded[0])["n"], 1);
        assert_eq!(value_of(&decoded[1])["n"], 2);
    }

    #[tokio::test]
    async fn test_malformed_body_is_serialization_error() {
        let (deserializer, order_placed) = deserializer();
        let body = Bytes::from_static(b"{not json");

        let err = deserializer.deserialize(&body, &[order_placed]).await.unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
