pub mod error;
pub mod field_value;
pub mod ids;
pub mod item;
pub mod key;

pub use error::CoreError;
pub use field_value::FieldValue;
pub use ids::{DocId, ItemId, LocalId};
pub use item::{ItemDraft, OrderedItem, FIELD_ACTIVE, FIELD_ORDER, PROVISIONAL_ORDER};
pub use key::{BucketKey, ChecklistKey, Weekday};
