//! Message metadata registry.
//!
//! Maps the type names senders put on the wire to canonical message types
//! and their metadata. The pipeline only reads from it; endpoints populate
//! it at startup with the message types they know.

use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::types::Result;

// =============================================================================
// Types
// =============================================================================

/// Canonical identity of a message type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageType(Arc<str>);

impl MessageType {
    pub fn new(full_name: impl Into<Arc<str>>) -> Self {
        Self(full_name.into())
    }

    pub fn full_name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Metadata attached to every logical message of a given type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageMetadata {
    message_type: MessageType,
    /// The type itself first, then its registered parents.
    message_hierarchy: Vec<MessageType>,
}

impl MessageMetadata {
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_hierarchy: vec![message_type.clone()],
            message_type,
        }
    }

    pub fn with_parents(mut self, parents: impl IntoIterator<Item = MessageType>) -> Self {
        for parent in parents {
            if !self.message_hierarchy.contains(&parent) {
                self.message_hierarchy.push(parent);
            }
        }
        self
    }

    pub fn message_type(&self) -> &MessageType {
        &self.message_type
    }

    pub fn message_hierarchy(&self) -> &[MessageType] {
        &self.message_hierarchy
    }
}

// =============================================================================
// Lookup capability
// =============================================================================

/// Read-only lookup from wire type names to metadata.
#[cfg_attr(test, mockall::automock)]
pub trait MessageMetadataLookup: Send + Sync {
    /// Metadata for a type name token, `None` if the type is unknown here.
    fn lookup(&self, type_name: &str) -> Result<Option<MessageMetadata>>;

    /// Metadata for an already resolved type.
    fn metadata_for(&self, message_type: &MessageType) -> Result<Option<MessageMetadata>>;
}

/// Strip assembly details from a qualified name:
/// `Ns.Type, Assembly, Version=1.0.0.0` becomes `Ns.Type`.
pub fn strip_assembly_qualification(type_name: &str) -> &str {
    type_name
        .split_once(',')
        .map_or(type_name, |(name, _)| name)
        .trim()
}

// =============================================================================
// In-memory registry
// =============================================================================

/// Thread-safe in-memory registry keyed by full type name.
#[derive(Debug, Default)]
pub struct MessageMetadataRegistry {
    entries: RwLock<HashMap<String, MessageMetadata>>,
}

impl MessageMetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register metadata, replacing any previous entry for the same type.
    pub fn register(&self, metadata: MessageMetadata) {
        let name = metadata.message_type().full_name().to_string();
        tracing::debug!("Registered message type {}", name);
        self.entries.write().insert(name, metadata);
    }

    /// Register a type with no parents and return its canonical identity.
    pub fn register_type(&self, full_name: &str) -> MessageType {
        let message_type = MessageType::new(full_name);
        self.register(MessageMetadata::new(message_type.clone()));
        message_type
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl MessageMetadataLookup for MessageMetadataRegistry {
    fn lookup(&self, type_name: &str) -> Result<Option<MessageMetadata>> {
        let entries = self.entries.read();
        let trimmed = type_name.trim();
        if let Some(metadata) = entries.get(trimmed) {
            return Ok(Some(metadata.clone()));
        }
        Ok(entries.get(strip_assembly_qualification(trimmed)).cloned())
    }

    fn metadata_for(&self, message_type: &MessageType) -> Result<Option<MessageMetadata>> {
        Ok(self.entries.read().get(message_type.full_name()).cloned())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_full_name() {
        let registry = MessageMetadataRegistry::new();
        let order_placed = registry.register_type("Sales.OrderPlaced");

        let metadata = registry.lookup("Sales.OrderPlaced").unwrap().unwrap();
        assert_eq!(metadata.message_type(), &order_placed);
        assert_eq!(metadata.message_hierarchy(), &[order_placed]);
    }

    #[test]
    fn test_lookup_assembly_qualified_name() {
        let registry = MessageMetadataRegistry::new();
        let order_placed = registry.register_type("Sales.OrderPlaced");

        let metadata = registry
            .lookup("Sales.OrderPlaced, Sales.Messages, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null")
            .unwrap()
            .unwrap();
        assert_eq!(metadata.message_type(), &order_placed);
    }

    #[test]
    fn test_lookup_unknown_is_none() {
        let registry = MessageMetadataRegistry::new();
        registry.register_type("Sales.OrderPlaced");

        assert!(registry.lookup("Sales.OrderCancelled").unwrap().is_none());
        assert!(registry.lookup("").unwrap().is_none());
    }

    #[test]
    fn test_hierarchy_keeps_parents_in_order_without_duplicates() {
        let child = MessageType::new("Sales.PriorityOrderPlaced");
        let parent = MessageType::new("Sales.OrderPlaced");
        let event = MessageType::new("Messaging.IEvent");

        let metadata = MessageMetadata::new(child.clone()).with_parents([
            parent.clone(),
            event.clone(),
            parent.clone(),
        ]);
        assert_eq!(metadata.message_hierarchy(), &[child, parent, event]);
    }

    #[test]
    fn test_metadata_for_registered_type() {
        let registry = MessageMetadataRegistry::new();
        let t = registry.register_type("Sales.OrderPlaced");
        assert!(registry.metadata_for(&t).unwrap().is_some());
        assert!(registry
            .metadata_for(&MessageType::new("Sales.Other"))
            .unwrap()
            .is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_strip_assembly_qualification() {
        assert_eq!(strip_assembly_qualification("A.B, Asm"), "A.B");
        assert_eq!(strip_assembly_qualification("A.B"), "A.B");
        assert_eq!(strip_assembly_qualification(" A.B ,x"), "A.B");
    }
}
