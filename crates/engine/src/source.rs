use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;

use tracing::warn;

use rotaplan_core::{
    BucketKey, FieldValue, ItemId, OrderedItem, FIELD_ACTIVE, FIELD_ORDER,
};
use rotaplan_store::{CollectionPath, ListenEvent, ListenerId, RawDocument, RemoteStore, StoreError};

/// Defensive decoding policy for documents arriving from the store. Missing
/// or mistyped `order` sorts last, missing `active` reads as visible, and
/// each configured text field falls back to an explicit placeholder so the
/// presentation layer never sees an absent value.
#[derive(Debug, Clone, Default)]
pub struct DecodeRules {
    pub text_defaults: Vec<(String, String)>,
}

impl DecodeRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text_default(mut self, field: impl Into<String>, placeholder: impl Into<String>) -> Self {
        self.text_defaults.push((field.into(), placeholder.into()));
        self
    }
}

/// One event out of a live subscription, queued until the engine pumps it.
#[derive(Debug)]
pub enum SourceEvent<K> {
    Snapshot { key: K, items: Vec<OrderedItem> },
    Failed { key: K, error: StoreError },
}

/// Maintains exactly one live subscription per bucket key and reconstructs
/// ordered item lists from raw documents. Events land in a single-threaded
/// inbox; applying them (and the conflict guard) is the engine's job.
pub struct SnapshotSource<K> {
    inbox: Rc<RefCell<VecDeque<SourceEvent<K>>>>,
    listeners: Vec<(K, ListenerId)>,
    rules: DecodeRules,
}

impl<K: BucketKey> SnapshotSource<K> {
    pub fn new(rules: DecodeRules) -> Self {
        Self {
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            listeners: Vec::new(),
            rules,
        }
    }

    /// Start the live query for `key`. The store delivers the current
    /// snapshot synchronously, so the bucket's first event is queued before
    /// this returns.
    pub fn attach(&mut self, store: &mut impl RemoteStore, key: K, path: &CollectionPath) {
        let inbox = Rc::clone(&self.inbox);
        let rules = self.rules.clone();
        let listener = store.listen(
            path,
            FIELD_ORDER,
            Box::new(move |event| {
                let event = match event {
                    ListenEvent::Snapshot(docs) => SourceEvent::Snapshot {
                        key,
                        items: decode_snapshot(docs, &rules),
                    },
                    ListenEvent::Error(error) => {
                        warn!(key = %key, error = %error, "subscription failed");
                        SourceEvent::Failed { key, error }
                    }
                };
                inbox.borrow_mut().push_back(event);
            }),
        );
        self.listeners.push((key, listener));
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<SourceEvent<K>> {
        self.inbox.borrow_mut().drain(..).collect()
    }

    /// Tear down every subscription (scope change). Pending events are
    /// dropped with them.
    pub fn detach_all(&mut self, store: &mut impl RemoteStore) {
        for (_, listener) in self.listeners.drain(..) {
            store.unlisten(listener);
        }
        self.inbox.borrow_mut().clear();
    }
}

/// Raw documents to ordered items: dedupe by first occurrence, default the
/// reserved fields, fill configured text placeholders, stable-sort so that
/// documents without a usable order value land last.
pub fn decode_snapshot(docs: Vec<RawDocument>, rules: &DecodeRules) -> Vec<OrderedItem> {
    let mut seen = BTreeSet::new();
    let mut items: Vec<OrderedItem> = docs
        .into_iter()
        .filter(|doc| seen.insert(doc.id))
        .map(|doc| decode_document(doc, rules))
        .collect();
    items.sort_by_key(|item| item.order);
    items
}

fn decode_document(doc: RawDocument, rules: &DecodeRules) -> OrderedItem {
    let id = ItemId::Doc(doc.id);
    let mut fields: BTreeMap<String, FieldValue> = doc.fields;

    let order = fields
        .remove(FIELD_ORDER)
        .and_then(|v| v.as_integer())
        .unwrap_or(i64::MAX);
    let active = fields
        .remove(FIELD_ACTIVE)
        .and_then(|v| v.as_boolean())
        .unwrap_or(true);

    for (field, placeholder) in &rules.text_defaults {
        let usable = fields.get(field).and_then(FieldValue::as_text).is_some();
        if !usable {
            fields.insert(field.clone(), FieldValue::Text(placeholder.clone()));
        }
    }

    OrderedItem {
        id,
        order,
        active,
        fields,
    }
}
