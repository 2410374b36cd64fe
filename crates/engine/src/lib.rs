pub mod bucket;
pub mod commit;
pub mod error;
pub mod source;

pub use bucket::BucketView;
pub use commit::{plan_commit, CommitPlan};
pub use error::EngineError;
pub use source::{decode_snapshot, DecodeRules, SnapshotSource, SourceEvent};

use std::collections::BTreeMap;

use tracing::{debug, warn};

use rotaplan_core::{BucketKey, ItemDraft, ItemId, OrderedItem};
use rotaplan_store::{CollectionPath, RemoteStore, StoreError, WriteOp};

use crate::bucket::Bucket;

/// The write batch produced by `begin_save`, to be submitted to the store
/// while the bucket is held busy. Callers bridging an asynchronous store
/// submit `ops` themselves and report the outcome through `finish_save`;
/// synchronous callers use `save`, which composes all three steps.
#[derive(Debug)]
pub struct PendingCommit {
    pub path: CollectionPath,
    pub ops: Vec<WriteOp>,
}

/// Draft/commit synchronization engine for ordered, per-key collections.
///
/// Owns the remote store handle, one `Bucket` per key, and the live
/// subscriptions feeding them. All state lives on one logical thread;
/// snapshot events queue in the source inbox until `pump` applies them, and
/// the conflict guard — a dirty or committing bucket never has its draft
/// replaced by an incoming snapshot — is enforced at that single point.
pub struct SyncEngine<K: BucketKey, S: RemoteStore> {
    store: S,
    buckets: BTreeMap<K, Bucket>,
    paths: BTreeMap<K, CollectionPath>,
    source: SnapshotSource<K>,
}

impl<K: BucketKey, S: RemoteStore> SyncEngine<K, S> {
    /// Create every bucket in the key set (`loading = true`) and start its
    /// subscription. The store delivers initial snapshots synchronously;
    /// they sit in the inbox until the first `pump`.
    pub fn open(
        store: S,
        rules: DecodeRules,
        keys: impl IntoIterator<Item = (K, CollectionPath)>,
    ) -> Self {
        let mut store = store;
        let mut source = SnapshotSource::new(rules);
        let mut buckets = BTreeMap::new();
        let mut paths = BTreeMap::new();
        for (key, path) in keys {
            source.attach(&mut store, key, &path);
            buckets.insert(key, Bucket::new());
            paths.insert(key, path);
        }
        Self {
            store,
            buckets,
            paths,
            source,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Apply every queued subscription event. Snapshots for clean, idle
    /// buckets replace draft and original; snapshots for dirty or committing
    /// buckets are dropped — the subscription is continuous, so the next
    /// clean moment re-syncs from the store's then-current state.
    pub fn pump(&mut self) {
        for event in self.source.drain() {
            match event {
                SourceEvent::Snapshot { key, items } => {
                    let Some(bucket) = self.buckets.get_mut(&key) else {
                        warn!(key = %key, "snapshot for unknown bucket");
                        continue;
                    };
                    if bucket.accepts_snapshots() {
                        bucket.draft = items.clone();
                        bucket.original = items;
                        bucket.loading = false;
                        bucket.sync_error = None;
                        debug!(key = %key, items = bucket.draft.len(), "snapshot applied");
                    } else {
                        debug!(key = %key, "snapshot dropped, bucket has unsaved edits");
                    }
                }
                SourceEvent::Failed { key, error } => {
                    let Some(bucket) = self.buckets.get_mut(&key) else {
                        continue;
                    };
                    bucket.loading = false;
                    bucket.sync_error = Some(error.to_string());
                }
            }
        }
    }

    pub fn bucket(&self, key: K) -> Option<BucketView<'_>> {
        self.buckets.get(&key).map(|bucket| BucketView {
            items: &bucket.draft,
            dirty: bucket.dirty,
            loading: bucket.loading,
            sync_error: bucket.sync_error.as_deref(),
        })
    }

    pub fn is_dirty(&self, key: K) -> bool {
        self.buckets.get(&key).is_some_and(|b| b.dirty)
    }

    /// Replace the draft with the same items in a new order.
    pub fn reorder(&mut self, key: K, items: Vec<OrderedItem>) -> Result<(), EngineError> {
        let bucket = self.lookup_mut(key)?;
        let mut ids: Vec<ItemId> = items.iter().map(|item| item.id).collect();
        ids.sort();
        if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(EngineError::DuplicateItem {
                bucket: key.to_string(),
                id: pair[0].to_string(),
            });
        }
        let mut current: Vec<ItemId> = bucket.draft.iter().map(|item| item.id).collect();
        current.sort();
        if ids != current {
            return Err(EngineError::ReorderMismatch(key.to_string()));
        }
        bucket.draft = items;
        bucket.dirty = true;
        Ok(())
    }

    /// Append a newly created item under a fresh local identity, ordered
    /// after everything already in the bucket.
    pub fn insert(&mut self, key: K, draft: ItemDraft) -> Result<ItemId, EngineError> {
        let bucket = self.lookup_mut(key)?;
        let item = draft.into_item(&bucket.draft);
        let id = item.id;
        bucket.draft.push(item);
        bucket.dirty = true;
        Ok(id)
    }

    /// Remove an item from the draft. Removing an id that is not present is
    /// a no-op and does not mark the bucket dirty. An item that never
    /// reached the store simply disappears, with no remote effect at commit
    /// time.
    pub fn remove(&mut self, key: K, id: ItemId) -> Result<(), EngineError> {
        let bucket = self.lookup_mut(key)?;
        if let Some(index) = bucket.find(id) {
            bucket.draft.remove(index);
            bucket.dirty = true;
        }
        Ok(())
    }

    /// Restore the draft to the last confirmed state. No network
    /// interaction; a no-op when the bucket is already clean.
    pub fn discard(&mut self, key: K) -> Result<(), EngineError> {
        let bucket = self.lookup_mut(key)?;
        if bucket.commit_in_flight {
            return Err(EngineError::CommitInFlight(key.to_string()));
        }
        if bucket.dirty {
            bucket.draft = bucket.original.clone();
            bucket.dirty = false;
            debug!(key = %key, "discarded draft");
        }
        Ok(())
    }

    /// Phase 1 of a commit: diff the draft against the retained original,
    /// resolve local identities through the store's allocator, and mark the
    /// bucket busy. Returns `None` when there is nothing to write — a clean
    /// bucket, or a dirty one whose edits cancelled out, in which case the
    /// dirty flag simply clears.
    pub fn begin_save(&mut self, key: K) -> Result<Option<PendingCommit>, EngineError> {
        let bucket = self
            .buckets
            .get_mut(&key)
            .ok_or_else(|| EngineError::UnknownBucket(key.to_string()))?;
        if bucket.commit_in_flight {
            return Err(EngineError::CommitInFlight(key.to_string()));
        }
        if !bucket.dirty {
            return Ok(None);
        }

        let store = &mut self.store;
        let plan = plan_commit(&bucket.original, &mut bucket.draft, || store.allocate_id());
        if plan.is_empty() {
            // Edits netted out to the confirmed state.
            bucket.dirty = false;
            return Ok(None);
        }

        let path = self
            .paths
            .get(&key)
            .ok_or_else(|| EngineError::UnknownBucket(key.to_string()))?
            .clone();
        bucket.commit_in_flight = true;
        bucket.pending = Some(plan.committed);
        debug!(key = %key, ops = plan.ops.len(), "commit planned");
        Ok(Some(PendingCommit {
            path,
            ops: plan.ops,
        }))
    }

    /// Phase 2 bookkeeping: fold the committed state into `original` on
    /// success, or leave draft, original, and the dirty flag untouched on
    /// failure so the user can retry or discard.
    pub fn finish_save(
        &mut self,
        key: K,
        outcome: Result<(), StoreError>,
    ) -> Result<(), EngineError> {
        let bucket = self.lookup_mut(key)?;
        if !bucket.commit_in_flight {
            return Err(EngineError::NoCommitInFlight(key.to_string()));
        }
        bucket.commit_in_flight = false;
        let pending = bucket.pending.take();

        match outcome {
            Ok(()) => {
                let Some(committed) = pending else {
                    return Err(EngineError::NoCommitInFlight(key.to_string()));
                };
                bucket.original = committed;
                // Edits made while the write was in flight stay dirty
                // against the new baseline; the synchronous path reduces to
                // dirty = false.
                bucket.dirty = bucket.draft != bucket.original;
                debug!(key = %key, "commit folded");
                Ok(())
            }
            Err(error) => {
                warn!(key = %key, error = %error, "commit failed, draft retained");
                Err(EngineError::Store(error))
            }
        }
    }

    /// Commit one bucket atomically: plan, submit, fold. Rejects with
    /// `CommitInFlight` while a previous commit for the same bucket is
    /// outstanding. On failure the draft and dirty flag are untouched.
    pub fn save(&mut self, key: K) -> Result<(), EngineError> {
        let Some(pending) = self.begin_save(key)? else {
            return Ok(());
        };
        let outcome = self.store.commit(&pending.path, &pending.ops);
        self.finish_save(key, outcome)
    }

    /// Tear down every subscription (scope change). Bucket state is dropped
    /// with the engine; an in-flight commit owned by a caller of
    /// `begin_save` resolves on its own.
    pub fn shutdown(&mut self) {
        self.source.detach_all(&mut self.store);
    }

    fn lookup_mut(&mut self, key: K) -> Result<&mut Bucket, EngineError> {
        self.buckets
            .get_mut(&key)
            .ok_or_else(|| EngineError::UnknownBucket(key.to_string()))
    }
}
