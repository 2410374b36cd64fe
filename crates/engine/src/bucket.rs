use rotaplan_core::{ItemId, OrderedItem};

/// Per-bucket state: the user-editable draft, the last state known to match
/// the remote store, and the flags gating snapshot application and commit.
#[derive(Debug, Default)]
pub struct Bucket {
    pub(crate) draft: Vec<OrderedItem>,
    pub(crate) original: Vec<OrderedItem>,
    pub(crate) dirty: bool,
    pub(crate) loading: bool,
    pub(crate) commit_in_flight: bool,
    /// Renormalized item list stashed by `begin_save`, folded into
    /// `original` on success.
    pub(crate) pending: Option<Vec<OrderedItem>>,
    /// Terminal subscription failure, surfaced to the UI as a banner
    /// condition rather than thrown.
    pub(crate) sync_error: Option<String>,
}

impl Bucket {
    pub(crate) fn new() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// A snapshot may replace the draft only while the bucket has no
    /// unsaved edits and no commit racing against its baseline.
    pub(crate) fn accepts_snapshots(&self) -> bool {
        !self.dirty && !self.commit_in_flight
    }

    pub(crate) fn find(&self, id: ItemId) -> Option<usize> {
        self.draft.iter().position(|item| item.id == id)
    }
}

/// Read view handed to the presentation layer.
#[derive(Debug, Clone, Copy)]
pub struct BucketView<'a> {
    pub items: &'a [OrderedItem],
    pub dirty: bool,
    pub loading: bool,
    pub sync_error: Option<&'a str>,
}
