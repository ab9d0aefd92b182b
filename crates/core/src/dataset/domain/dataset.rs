use std::collections::BTreeMap;

use crate::dataset::domain::identity::Identity;

/// Feature vector for one detected face, as produced by the detector.
pub type FaceEncoding = Vec<f32>;

/// Opaque per-identity value carried by the name index.
pub type IdentityMetadata = serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
struct Entry<E> {
    encodings: Vec<E>,
    metadata: IdentityMetadata,
}

/// Identity → ordered encodings.
///
/// The in-memory order of each sequence is authoritative: encoding `i` of
/// an identity is persisted at position `i`. Identities iterate in name
/// order.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset<E> {
    entries: BTreeMap<Identity, Entry<E>>,
}

impl<E> Default for Dataset<E> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<E> Dataset<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `identity` with no encodings if absent, keeping existing
    /// metadata otherwise.
    pub fn insert_identity(&mut self, identity: Identity, metadata: IdentityMetadata) {
        self.entries.entry(identity).or_insert_with(|| Entry {
            encodings: Vec::new(),
            metadata,
        });
    }

    /// Appends an encoding, creating the identity with empty metadata if
    /// needed.
    pub fn add_encoding(&mut self, identity: Identity, encoding: E) {
        self.entries
            .entry(identity)
            .or_insert_with(|| Entry {
                encodings: Vec::new(),
                metadata: empty_metadata(),
            })
            .encodings
            .push(encoding);
    }

    pub fn encodings(&self, identity: &Identity) -> Option<&[E]> {
        self.entries.get(identity).map(|e| e.encodings.as_slice())
    }

    pub fn metadata(&self, identity: &Identity) -> Option<&IdentityMetadata> {
        self.entries.get(identity).map(|e| &e.metadata)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identity, &[E])> {
        self.entries
            .iter()
            .map(|(id, e)| (id, e.encodings.as_slice()))
    }

    /// Shortens an identity's sequence to at most `len` encodings.
    pub fn truncate_encodings(&mut self, identity: &Identity, len: usize) {
        if let Some(entry) = self.entries.get_mut(identity) {
            entry.encodings.truncate(len);
        }
    }

    pub fn remove_identity(&mut self, identity: &Identity) -> Option<Vec<E>> {
        self.entries.remove(identity).map(|e| e.encodings)
    }

    /// Number of identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn encoding_count(&self) -> usize {
        self.entries.values().map(|e| e.encodings.len()).sum()
    }
}

pub fn empty_metadata() -> IdentityMetadata {
    serde_json::Value::Object(serde_json::Map::new())
}
