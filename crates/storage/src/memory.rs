use std::collections::BTreeMap;

use tracing::debug;

use rotaplan_core::{DocId, FieldValue};

use crate::document::{sort_snapshot, CollectionPath, RawDocument};
use crate::error::StoreError;
use crate::traits::{ListenCallback, ListenEvent, ListenerId, RemoteStore, WriteOp};

struct Listener {
    id: u64,
    path: String,
    order_by: String,
    callback: ListenCallback,
}

/// In-memory backend with synchronous listener dispatch. Backs the test
/// harness and local development; the contract matches `SqliteStore`.
#[derive(Default)]
pub struct MemoryStore {
    collections: BTreeMap<String, BTreeMap<DocId, BTreeMap<String, FieldValue>>>,
    listeners: Vec<Listener>,
    next_listener: u64,
    commit_count: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful commits observed, across all paths.
    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    /// Current documents under `path`, in snapshot order.
    pub fn documents(&self, path: &CollectionPath) -> Vec<RawDocument> {
        self.snapshot(path.as_str(), rotaplan_core::FIELD_ORDER)
    }

    pub fn document(&self, path: &CollectionPath, id: DocId) -> Option<RawDocument> {
        self.collections
            .get(path.as_str())
            .and_then(|coll| coll.get(&id))
            .map(|fields| RawDocument::new(id, fields.clone()))
    }

    /// Put documents under `path` directly, bypassing batch validation, and
    /// notify listeners. Stands in for writes by another actor.
    pub fn seed(&mut self, path: &CollectionPath, docs: Vec<RawDocument>) {
        let coll = self.collections.entry(path.as_str().to_string()).or_default();
        for doc in docs {
            coll.insert(doc.id, doc.fields);
        }
        self.notify(path);
    }

    /// Delete a document directly, as another actor would, and notify.
    pub fn seed_delete(&mut self, path: &CollectionPath, id: DocId) {
        if let Some(coll) = self.collections.get_mut(path.as_str()) {
            coll.remove(&id);
        }
        self.notify(path);
    }

    /// Send a terminal error to every listener registered on `path` and
    /// drop them. Test hook standing in for a broken subscription.
    pub fn fail_listeners(&mut self, path: &CollectionPath, message: &str) {
        let mut failed = Vec::new();
        self.listeners.retain_mut(|listener| {
            if listener.path == path.as_str() {
                failed.push(listener.id);
                (listener.callback)(ListenEvent::Error(StoreError::Unavailable(
                    message.to_string(),
                )));
                false
            } else {
                true
            }
        });
        debug!(path = %path, count = failed.len(), "failed listeners");
    }

    fn snapshot(&self, path: &str, order_by: &str) -> Vec<RawDocument> {
        let mut docs: Vec<RawDocument> = self
            .collections
            .get(path)
            .map(|coll| {
                coll.iter()
                    .map(|(id, fields)| RawDocument::new(*id, fields.clone()))
                    .collect()
            })
            .unwrap_or_default();
        sort_snapshot(&mut docs, order_by);
        docs
    }

    fn notify(&mut self, path: &CollectionPath) {
        let mut events = Vec::new();
        for listener in &self.listeners {
            if listener.path == path.as_str() {
                events.push((listener.id, self.snapshot(&listener.path, &listener.order_by)));
            }
        }
        for (id, docs) in events {
            if let Some(listener) = self.listeners.iter_mut().find(|l| l.id == id) {
                (listener.callback)(ListenEvent::Snapshot(docs));
            }
        }
    }
}

impl RemoteStore for MemoryStore {
    fn listen(
        &mut self,
        path: &CollectionPath,
        order_by: &str,
        mut callback: ListenCallback,
    ) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        callback(ListenEvent::Snapshot(self.snapshot(path.as_str(), order_by)));
        self.listeners.push(Listener {
            id,
            path: path.as_str().to_string(),
            order_by: order_by.to_string(),
            callback,
        });
        ListenerId(id)
    }

    fn unlisten(&mut self, listener: ListenerId) {
        self.listeners.retain(|l| l.id != listener.0);
    }

    fn allocate_id(&mut self) -> DocId {
        DocId::new()
    }

    fn commit(&mut self, path: &CollectionPath, ops: &[WriteOp]) -> Result<(), StoreError> {
        let coll = self.collections.entry(path.as_str().to_string()).or_default();

        // Validate before applying anything: the batch is all-or-nothing.
        let mut pending_creates = Vec::new();
        for op in ops {
            if let WriteOp::Create { id, .. } = op {
                if coll.contains_key(id) || pending_creates.contains(id) {
                    return Err(StoreError::Rejected(format!(
                        "create collision on document {id}"
                    )));
                }
                pending_creates.push(*id);
            }
        }

        for op in ops {
            match op {
                WriteOp::Create { id, fields } => {
                    coll.insert(*id, fields.clone());
                }
                WriteOp::Merge { id, fields } => {
                    let doc = coll.entry(*id).or_default();
                    for (key, value) in fields {
                        doc.insert(key.clone(), value.clone());
                    }
                }
                WriteOp::Delete { id } => {
                    coll.remove(id);
                }
            }
        }

        self.commit_count += 1;
        debug!(path = %path, ops = ops.len(), "committed batch");
        self.notify(path);
        Ok(())
    }
}
