use async_trait::async_trait;
use notehall_shared::{Comment, NewComment};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::StoreError;

/// The document store a comment thread lives in.
///
/// Ordering is the store's job: `fetch` and every snapshot delivered by
/// `subscribe` are sorted by store-assigned `created_at` ascending, and
/// clients never re-sort. Implementations assign `id` and `created_at` on
/// append.
#[async_trait]
pub trait CommentStore: Send + Sync + 'static {
    /// One-shot ordered read of every comment in the scope.
    async fn fetch(&self, scope_id: Uuid) -> Result<Vec<Comment>, StoreError>;

    /// Opens a live query for the scope. The returned handle yields the
    /// current state first, then one complete list per change by any
    /// writer. Dropping the handle releases the subscription.
    async fn subscribe(&self, scope_id: Uuid) -> Result<Snapshots, StoreError>;

    /// Appends a comment, assigning `id` and a `created_at` that is
    /// monotonically increasing within the scope.
    ///
    /// A reply whose parent is present but is itself a reply is rejected;
    /// single-level nesting is a data-model rule here, not a UI
    /// convention. A reply whose parent is absent is accepted, because
    /// the parent may have been deleted while the reply was in flight.
    async fn append(&self, new: NewComment) -> Result<Comment, StoreError>;

    /// Deletes a comment. Only the stored author may delete; replies to a
    /// deleted top-level comment are left in place.
    async fn delete(
        &self,
        scope_id: Uuid,
        comment_id: Uuid,
        acting_author_id: Uuid,
    ) -> Result<(), StoreError>;

    /// Best-effort adjustment of the denormalized per-scope comment
    /// counter. This write is independent of `append`/`delete`, so the
    /// counter can go stale; it is never the source of truth.
    async fn bump_comment_count(&self, scope_id: Uuid, delta: i64) -> Result<(), StoreError>;

    /// Reads the denormalized counter.
    async fn comment_count(&self, scope_id: Uuid) -> Result<i64, StoreError>;
}

/// A live subscription to one scope's comment list.
///
/// Each item is the complete current list, never a diff. The underlying
/// channel may drop intermediate snapshots under load; that is safe to
/// ignore, because any later snapshot supersedes everything before it.
pub struct Snapshots {
    first: Option<Vec<Comment>>,
    rx: broadcast::Receiver<Vec<Comment>>,
}

impl Snapshots {
    pub fn new(initial: Vec<Comment>, rx: broadcast::Receiver<Vec<Comment>>) -> Self {
        Self {
            first: Some(initial),
            rx,
        }
    }

    /// Waits for the next snapshot. Returns `None` once the store side of
    /// the subscription has gone away.
    pub async fn next(&mut self) -> Option<Vec<Comment>> {
        if let Some(first) = self.first.take() {
            return Some(first);
        }
        loop {
            match self.rx.recv().await {
                Ok(list) => return Some(list),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "comment feed lagged, skipping to newest snapshot");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
