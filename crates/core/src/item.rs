use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field_value::FieldValue;
use crate::ids::ItemId;

/// Reserved document field holding an item's position within its bucket.
pub const FIELD_ORDER: &str = "order";
/// Reserved document field holding an item's soft-visibility flag.
pub const FIELD_ACTIVE: &str = "active";

/// Floor for order values assigned to newly inserted items. Keeps them
/// sorting after every store-backed item until commit renormalizes order
/// to contiguous array positions.
pub const PROVISIONAL_ORDER: i64 = 9999;

/// One item of an ordered bucket. `order` is unique and contiguous `0..n-1`
/// only after a successful commit; during editing it may be provisional.
/// Everything besides `id`/`order`/`active` lives in `fields`, opaque to the
/// engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedItem {
    pub id: ItemId,
    pub order: i64,
    pub active: bool,
    pub fields: BTreeMap<String, FieldValue>,
}

impl OrderedItem {
    pub fn is_local(&self) -> bool {
        self.id.is_local()
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }
}

/// What `insert` accepts: the domain fields of a not-yet-persisted item.
/// The engine assigns the identity and the provisional order.
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub active: bool,
    pub fields: BTreeMap<String, FieldValue>,
}

impl ItemDraft {
    pub fn new() -> Self {
        Self {
            active: true,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Materialize as a draft-only item with a fresh local identity, appended
    /// after every existing item.
    pub fn into_item(self, existing: &[OrderedItem]) -> OrderedItem {
        OrderedItem {
            id: ItemId::fresh_local(),
            order: provisional_order(existing),
            active: self.active,
            fields: self.fields,
        }
    }
}

/// Order value for an appended item: past the provisional floor and past
/// every order already present in the bucket.
pub fn provisional_order(existing: &[OrderedItem]) -> i64 {
    existing
        .iter()
        .map(|item| item.order.saturating_add(1))
        .max()
        .unwrap_or(PROVISIONAL_ORDER)
        .max(PROVISIONAL_ORDER)
}
