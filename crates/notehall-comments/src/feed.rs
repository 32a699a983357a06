use std::sync::Arc;

use notehall_shared::Comment;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::store::CommentStore;

/// A live view of one scope's comment thread.
///
/// Owns the background task that drives the store subscription. The
/// callback receives the complete current list on every snapshot; callers
/// replace whatever they were holding and re-run thread reconstruction.
///
/// Dropping the feed cancels the subscription, so a view that ties the
/// feed's lifetime to its own cannot leak a live query. Switching scope
/// means dropping the old feed before opening the new one.
pub struct CommentFeed {
    task: Option<JoinHandle<()>>,
}

impl CommentFeed {
    /// Opens a feed for `scope_id`, delivering snapshots to `on_snapshot`.
    ///
    /// If the subscription cannot be established (permission denial being
    /// the usual cause), the callback is invoked once with an empty list
    /// and the failure is logged; the rest of the page stays usable and
    /// no retry is attempted.
    pub async fn open<S, F>(store: Arc<S>, scope_id: Uuid, mut on_snapshot: F) -> CommentFeed
    where
        S: CommentStore + ?Sized,
        F: FnMut(Vec<Comment>) + Send + 'static,
    {
        let mut snapshots = match store.subscribe(scope_id).await {
            Ok(snapshots) => snapshots,
            Err(err) => {
                tracing::warn!(%scope_id, %err, "comment subscription failed, showing empty thread");
                on_snapshot(Vec::new());
                return CommentFeed { task: None };
            }
        };

        let task = tokio::spawn(async move {
            while let Some(list) = snapshots.next().await {
                on_snapshot(list);
            }
            tracing::debug!(%scope_id, "comment feed closed by store");
        });

        CommentFeed { task: Some(task) }
    }
}

impl Drop for CommentFeed {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
