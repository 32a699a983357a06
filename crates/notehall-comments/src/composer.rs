use std::sync::Arc;

use notehall_shared::{Comment, Identity, NewComment};
use uuid::Uuid;

use crate::error::CommentError;
use crate::store::CommentStore;

/// The write path for comment threads.
///
/// Every call takes the acting [`Identity`] explicitly. Failures are
/// reported to the caller and never retried; local state is never mutated
/// optimistically, so the subscription's next snapshot remains the single
/// source of truth for what happened.
pub struct Composer<S: CommentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: CommentStore + ?Sized> Composer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Posts a new top-level comment.
    pub async fn post_top_level(
        &self,
        scope_id: Uuid,
        author: &Identity,
        text: &str,
    ) -> Result<Comment, CommentError> {
        self.post(scope_id, author, text, None).await
    }

    /// Posts a reply to a top-level comment.
    ///
    /// The parent is not checked for existence here; if it is deleted
    /// while this call is in flight, the reply still lands and thread
    /// reconstruction hides it.
    pub async fn post_reply(
        &self,
        scope_id: Uuid,
        author: &Identity,
        text: &str,
        parent_comment_id: Uuid,
    ) -> Result<Comment, CommentError> {
        self.post(scope_id, author, text, Some(parent_comment_id))
            .await
    }

    async fn post(
        &self,
        scope_id: Uuid,
        author: &Identity,
        text: &str,
        parent_comment_id: Option<Uuid>,
    ) -> Result<Comment, CommentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentError::Validation(
                "comment text must not be empty".to_string(),
            ));
        }

        let comment = self
            .store
            .append(NewComment {
                scope_id,
                author_id: author.id,
                author_name: author.display_name.clone(),
                text: text.to_string(),
                parent_comment_id,
            })
            .await?;

        // Second, independent write; if it fails the counter goes stale
        // until the next full count, which is tolerated.
        if let Err(err) = self.store.bump_comment_count(scope_id, 1).await {
            tracing::warn!(%scope_id, %err, "comment counter bump failed");
        }

        Ok(comment)
    }

    /// Deletes a comment the acting identity authored.
    ///
    /// Ownership is enforced by the store against the stored `author_id`.
    /// Replies to a deleted top-level comment are left in place; they
    /// drop out of rendered threads via the orphan rule.
    pub async fn delete_comment(
        &self,
        scope_id: Uuid,
        comment_id: Uuid,
        acting: &Identity,
    ) -> Result<(), CommentError> {
        self.store.delete(scope_id, comment_id, acting.id).await?;

        if let Err(err) = self.store.bump_comment_count(scope_id, -1).await {
            tracing::warn!(%scope_id, %err, "comment counter decrement failed");
        }

        Ok(())
    }
}
