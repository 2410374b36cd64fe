use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use rotaplan_core::{DocId, FieldValue};

/// Slash-joined path of one remote collection, e.g.
/// `buildings/b1/tasks/mon`. One bucket maps to exactly one path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn join(segments: &[&str]) -> Self {
        Self(segments.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document as the store holds it: authoritative identity plus a field bag.
/// Reconstruction into engine items (with defensive defaulting) happens at
/// the snapshot source, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: DocId,
    pub fields: BTreeMap<String, FieldValue>,
}

impl RawDocument {
    pub fn new(id: DocId, fields: BTreeMap<String, FieldValue>) -> Self {
        Self { id, fields }
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

/// Snapshot ordering shared by every backend: ascending by the integer
/// `order_by` field; documents missing the field (or holding a non-integer)
/// sort last; ties break on id so delivery order is deterministic.
pub fn sort_snapshot(docs: &mut [RawDocument], order_by: &str) {
    docs.sort_by_key(|doc| {
        let rank = doc
            .field(order_by)
            .and_then(FieldValue::as_integer)
            .unwrap_or(i64::MAX);
        (rank, doc.id)
    });
}
