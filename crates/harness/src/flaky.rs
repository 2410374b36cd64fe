use rotaplan_core::DocId;
use rotaplan_store::{
    CollectionPath, ListenCallback, ListenerId, RemoteStore, StoreError, WriteOp,
};

/// Delegating store wrapper with injectable commit failures, standing in for
/// the network faults a remote store would produce.
pub struct FlakyStore<S> {
    inner: S,
    fail_commits: u32,
    commits_attempted: u64,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_commits: 0,
            commits_attempted: 0,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Make the next `count` commits fail with `StoreError::Unavailable`
    /// before reaching the inner store.
    pub fn fail_next_commits(&mut self, count: u32) {
        self.fail_commits = count;
    }

    pub fn commits_attempted(&self) -> u64 {
        self.commits_attempted
    }
}

impl<S: RemoteStore> RemoteStore for FlakyStore<S> {
    fn listen(
        &mut self,
        path: &CollectionPath,
        order_by: &str,
        callback: ListenCallback,
    ) -> ListenerId {
        self.inner.listen(path, order_by, callback)
    }

    fn unlisten(&mut self, listener: ListenerId) {
        self.inner.unlisten(listener);
    }

    fn allocate_id(&mut self) -> DocId {
        self.inner.allocate_id()
    }

    fn commit(&mut self, path: &CollectionPath, ops: &[WriteOp]) -> Result<(), StoreError> {
        self.commits_attempted += 1;
        if self.fail_commits > 0 {
            self.fail_commits -= 1;
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }
        self.inner.commit(path, ops)
    }
}
