use std::collections::BTreeMap;

use rotaplan_core::{DocId, FieldValue, ItemDraft, OrderedItem, Weekday, FIELD_ACTIVE, FIELD_ORDER};
use rotaplan_engine::{DecodeRules, SyncEngine};
use rotaplan_store::{CollectionPath, MemoryStore, RawDocument};

use crate::flaky::FlakyStore;

/// Placeholder filled in for documents arriving without a usable title.
pub const UNTITLED: &str = "(untitled)";

/// Scheduler-screen fixture: a `SyncEngine` over all seven weekday buckets,
/// backed by a fault-injectable in-memory store.
pub struct TestBoard {
    pub engine: SyncEngine<Weekday, FlakyStore<MemoryStore>>,
}

impl Default for TestBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBoard {
    pub fn new() -> Self {
        let store = FlakyStore::new(MemoryStore::new());
        let rules = DecodeRules::new().text_default("title", UNTITLED);
        let engine = SyncEngine::open(
            store,
            rules,
            Weekday::ALL.map(|day| (day, Self::path(day))),
        );
        Self { engine }
    }

    pub fn path(day: Weekday) -> CollectionPath {
        CollectionPath::join(&["buildings", "demo", "tasks", day.as_str()])
    }

    pub fn pump(&mut self) {
        self.engine.pump();
    }

    pub fn store(&self) -> &MemoryStore {
        self.engine.store().inner()
    }

    pub fn store_mut(&mut self) -> &mut MemoryStore {
        self.engine.store_mut().inner_mut()
    }

    /// Write task documents for `day` directly into the store, as another
    /// actor would, and return their ids in the given order.
    pub fn seed(&mut self, day: Weekday, tasks: &[(&str, i64)]) -> Vec<DocId> {
        let docs: Vec<RawDocument> = tasks
            .iter()
            .map(|(title, order)| task_doc(DocId::new(), title, *order))
            .collect();
        let ids = docs.iter().map(|doc| doc.id).collect();
        self.store_mut().seed(&Self::path(day), docs);
        ids
    }

    /// Current draft items for `day`. Every weekday bucket exists on this
    /// board, so a missing view only means an empty list.
    pub fn items(&self, day: Weekday) -> Vec<OrderedItem> {
        self.engine
            .bucket(day)
            .map(|view| view.items.to_vec())
            .unwrap_or_default()
    }

    pub fn titles(&self, day: Weekday) -> Vec<String> {
        self.items(day)
            .iter()
            .map(|item| {
                item.field("title")
                    .and_then(FieldValue::as_text)
                    .unwrap_or(UNTITLED)
                    .to_string()
            })
            .collect()
    }
}

/// A task document as the remote store would hold it.
pub fn task_doc(id: DocId, title: &str, order: i64) -> RawDocument {
    let mut fields = BTreeMap::new();
    fields.insert("title".to_string(), FieldValue::Text(title.to_string()));
    fields.insert(FIELD_ORDER.to_string(), FieldValue::Integer(order));
    fields.insert(FIELD_ACTIVE.to_string(), FieldValue::Boolean(true));
    RawDocument::new(id, fields)
}

/// A draft for a task created in the editor.
pub fn task_draft(title: &str) -> ItemDraft {
    ItemDraft::new().with_field("title", FieldValue::Text(title.to_string()))
}
