//! Core enumerations for incoming envelopes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a message was sent, as declared by the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MessageIntent {
    #[default]
    Send,
    Publish,
    Subscribe,
    Unsubscribe,
    Reply,
}

impl MessageIntent {
    /// Parse an intent header value. Matching is case-insensitive; unknown
    /// values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        [
            MessageIntent::Send,
            MessageIntent::Publish,
            MessageIntent::Subscribe,
            MessageIntent::Unsubscribe,
            MessageIntent::Reply,
        ]
        .into_iter()
        .find(|intent| intent.as_str().eq_ignore_ascii_case(value))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageIntent::Send => "Send",
            MessageIntent::Publish => "Publish",
            MessageIntent::Subscribe => "Subscribe",
            MessageIntent::Unsubscribe => "Unsubscribe",
            MessageIntent::Reply => "Reply",
        }
    }
}

impl fmt::Display for MessageIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
