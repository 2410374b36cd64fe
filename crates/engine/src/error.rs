use rotaplan_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("unknown bucket: {0}")]
    UnknownBucket(String),

    #[error("commit already in flight for bucket: {0}")]
    CommitInFlight(String),

    #[error("no commit in flight for bucket: {0}")]
    NoCommitInFlight(String),

    #[error("reorder changed the item set for bucket: {0}")]
    ReorderMismatch(String),

    #[error("duplicate item id in bucket {bucket}: {id}")]
    DuplicateItem { bucket: String, id: String },
}
