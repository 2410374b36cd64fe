use std::collections::BTreeMap;

use rotaplan_core::{DocId, FieldValue};

use crate::document::{CollectionPath, RawDocument};
use crate::error::StoreError;

/// One entry of an atomic write batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert a new document. Rejected if the id already exists.
    Create {
        id: DocId,
        fields: BTreeMap<String, FieldValue>,
    },
    /// Upsert with merge semantics: named fields overwrite, absent fields
    /// are left untouched, and a missing document is created.
    Merge {
        id: DocId,
        fields: BTreeMap<String, FieldValue>,
    },
    /// Remove a document. Deleting an absent id is not an error.
    Delete { id: DocId },
}

impl WriteOp {
    pub fn doc_id(&self) -> DocId {
        match self {
            Self::Create { id, .. } | Self::Merge { id, .. } | Self::Delete { id } => *id,
        }
    }
}

/// What a live-query listener receives. A snapshot is always the full
/// ordered document list for the path, never a delta. `Error` is terminal
/// for that listener; retry policy belongs to the caller.
#[derive(Debug)]
pub enum ListenEvent {
    Snapshot(Vec<RawDocument>),
    Error(StoreError),
}

pub type ListenCallback = Box<dyn FnMut(ListenEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// The authoritative document store, as the engine consumes it: live-query
/// subscriptions, pre-write identity allocation, and an all-or-nothing
/// multi-document write scoped to one collection.
pub trait RemoteStore {
    /// Register a live query on `path` ordered by the integer field
    /// `order_by` ascending. The callback fires synchronously with the
    /// current snapshot on registration, then after every successful commit
    /// touching the path.
    fn listen(
        &mut self,
        path: &CollectionPath,
        order_by: &str,
        callback: ListenCallback,
    ) -> ListenerId;

    fn unlisten(&mut self, listener: ListenerId);

    /// Obtain a fresh, store-unique identity ahead of a write.
    fn allocate_id(&mut self) -> DocId;

    /// Apply all ops to `path` as one atomic unit: either every op takes
    /// effect or none does.
    fn commit(&mut self, path: &CollectionPath, ops: &[WriteOp]) -> Result<(), StoreError>;
}
