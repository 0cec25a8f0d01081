//! Wire names of the headers this crate reads and writes.
//!
//! These must match what deployed endpoints put on the wire.

/// Semicolon-separated type names of the body's contents.
pub const ENCLOSED_MESSAGE_TYPES: &str = "NServiceBus.EnclosedMessageTypes";

/// `True`/`False`; control messages carry their payload in headers.
pub const CONTROL_MESSAGE: &str = "NServiceBus.ControlMessage";

/// Content type of the body. Overwritten with the resolved deserializer's
/// canonical value during deserialization.
pub const CONTENT_TYPE: &str = "NServiceBus.ContentType";

/// Sender-declared intent (`Send`, `Publish`, ...).
pub const MESSAGE_INTENT: &str = "NServiceBus.MessageIntent";

pub const MESSAGE_ID: &str = "NServiceBus.MessageId";

/// Marker of the legacy wire format that appended implementation-type
/// suffixes to enclosed type names.
pub const LEGACY_IMPL_MARKER: &str = "__impl";
