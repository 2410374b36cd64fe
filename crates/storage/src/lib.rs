pub mod document;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use document::{sort_snapshot, CollectionPath, RawDocument};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{ListenCallback, ListenEvent, ListenerId, RemoteStore, WriteOp};
