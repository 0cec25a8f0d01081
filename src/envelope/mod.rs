//! Envelope - the received physical message.
//!
//! An [`IncomingMessage`] is what the transport hands to the incoming
//! pipeline: an id, an ordered header map and the raw body bytes. It is
//! value-like with one deliberate exception: the header map is shared
//! mutable state. Every stage processing the same envelope holds a handle
//! to the same map, so a header written by one stage (the deserialization
//! stage injects the resolved content type) is visible to all stages that
//! run after it.

use bytes::Bytes;
use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::Arc;

use crate::types::MessageId;

pub mod enums;
pub mod headers;

pub use enums::MessageIntent;

/// Ordered, case-sensitive header mapping.
pub type Headers = IndexMap<String, String>;

/// Header map shared by every stage processing one envelope.
///
/// Cloning yields another handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct SharedHeaders(Arc<RwLock<Headers>>);

impl SharedHeaders {
    pub fn new(headers: Headers) -> Self {
        Self(Arc::new(RwLock::new(headers)))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.0.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    /// Insert or overwrite a header. Existing keys keep their position.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.write().insert(key.into(), value.into())
    }

    /// Borrow the map for reading. Do not hold the guard across an await.
    pub fn read(&self) -> RwLockReadGuard<'_, Headers> {
        self.0.read()
    }

    /// Copy of the current headers.
    pub fn snapshot(&self) -> Headers {
        self.0.read().clone()
    }

    /// Whether two handles point at the same map.
    pub fn ptr_eq(&self, other: &SharedHeaders) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Headers> for SharedHeaders {
    fn from(headers: Headers) -> Self {
        Self::new(headers)
    }
}

/// A received message before deserialization.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    id: MessageId,
    headers: SharedHeaders,
    body: Bytes,
}

impl IncomingMessage {
    pub fn new(id: MessageId, headers: impl Into<SharedHeaders>, body: impl Into<Bytes>) -> Self {
        Self {
            id,
            headers: headers.into(),
            body: body.into(),
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn headers(&self) -> &SharedHeaders {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// True when the control-message header equals `true`, ignoring case.
    pub fn is_control_message(&self) -> bool {
        self.headers
            .read()
            .get(headers::CONTROL_MESSAGE)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    /// Sender-declared intent; `Send` when absent or unrecognised.
    pub fn message_intent(&self) -> MessageIntent {
        self.headers
            .read()
            .get(headers::MESSAGE_INTENT)
            .and_then(|value| MessageIntent::parse(value))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(pairs: &[(&str, &str)], body: &'static [u8]) -> IncomingMessage {
        let headers: Headers = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IncomingMessage::new(MessageId::new(), headers, Bytes::from_static(body))
    }

    #[test]
    fn test_control_message_any_casing() {
        for value in ["true", "True", "TRUE"] {
            assert!(message(&[(headers::CONTROL_MESSAGE, value)], b"").is_control_message());
        }
        assert!(!message(&[(headers::CONTROL_MESSAGE, "False")], b"").is_control_message());
        assert!(!message(&[(headers::CONTROL_MESSAGE, "yes")], b"").is_control_message());
        assert!(!message(&[], b"").is_control_message());
    }

    #[test]
    fn test_header_keys_are_case_sensitive() {
        let msg = message(&[("nservicebus.controlmessage", "true")], b"{}");
        assert!(!msg.is_control_message());
    }

    #[test]
    fn test_message_intent_defaults_to_send() {
        assert_eq!(message(&[], b"").message_intent(), MessageIntent::Send);
        assert_eq!(
            message(&[(headers::MESSAGE_INTENT, "Publish")], b"").message_intent(),
            MessageIntent::Publish
        );
        assert_eq!(
            message(&[(headers::MESSAGE_INTENT, "garbage")], b"").message_intent(),
            MessageIntent::Send
        );
    }

    #[test]
    fn test_cloned_message_shares_headers() {
        let msg = message(&[("a", "1"), ("b", "2")], b"{}");
        let clone = msg.clone();

        clone.headers().insert("c", "3");
        clone.headers().insert("a", "updated");

        assert!(msg.headers().ptr_eq(clone.headers()));
        let keys: Vec<String> = msg.headers().snapshot().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(msg.headers().get("a").as_deref(), Some("updated"));
    }
}
