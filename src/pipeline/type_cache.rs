//! Cache of parsed enclosed-message-types headers.
//!
//! Keyed by the raw header value. Parsing is deterministic for a given
//! registry, so entries never expire, and two envelopes racing to parse the
//! same unseen value may both compute it: whichever insert lands first is
//! kept and the other result is dropped.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

use crate::envelope::headers::LEGACY_IMPL_MARKER;
use crate::registry::{MessageMetadataLookup, MessageType};
use crate::types::Result;

/// Ordered types resolved from one header value.
pub type ResolvedTypes = Arc<[MessageType]>;

pub struct EnclosedMessageTypesCache {
    registry: Arc<dyn MessageMetadataLookup>,
    entries: DashMap<String, ResolvedTypes>,
}

impl fmt::Debug for EnclosedMessageTypesCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnclosedMessageTypesCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl EnclosedMessageTypesCache {
    pub fn new(registry: Arc<dyn MessageMetadataLookup>) -> Self {
        Self {
            registry,
            entries: DashMap::new(),
        }
    }

    /// Resolve a header value, parsing it on first sight.
    ///
    /// A failed parse (registry error) is not cached.
    pub fn resolve(&self, header_value: &str) -> Result<ResolvedTypes> {
        if let Some(hit) = self.entries.get(header_value) {
            return Ok(Arc::clone(hit.value()));
        }

        // The shard lock is not held while the registry is consulted.
        let parsed = parse_enclosed_message_types(header_value, self.registry.as_ref())?;
        let entry = self
            .entries
            .entry(header_value.to_owned())
            .or_insert(parsed);
        Ok(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tokens written by the legacy wire format that appended implementation
/// suffixes. They never name a usable type.
fn is_legacy_impl_token(token: &str) -> bool {
    token.contains(LEGACY_IMPL_MARKER)
}

/// Parse a `;`-separated list of type names into canonical types.
///
/// Legacy `__impl` tokens are skipped without touching the registry;
/// tokens the registry does not know are dropped. Encounter order is kept
/// and a type resolved by more than one token appears once.
pub fn parse_enclosed_message_types(
    header_value: &str,
    registry: &dyn MessageMetadataLookup,
) -> Result<ResolvedTypes> {
    let mut types: Vec<MessageType> = Vec::with_capacity(header_value.matches(';').count() + 1);

    for token in header_value.split(';') {
        if is_legacy_impl_token(token) {
            tracing::trace!(token, "Skipping legacy implementation type");
            continue;
        }

        match registry.lookup(token)? {
            Some(metadata) => {
                let message_type = metadata.message_type();
                if !types.contains(message_type) {
                    types.push(message_type.clone());
                }
            }
            None => {
                tracing::debug!(token, "No metadata registered for enclosed message type");
            }
        }
    }

    Ok(types.into())
}
