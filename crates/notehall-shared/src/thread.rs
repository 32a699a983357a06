//! Flat-list-to-thread reconstruction.
//!
//! The store hands subscribers one flat, `created_at`-ascending list per
//! snapshot. Views call [`build_threads`] on every snapshot to get the
//! two-level structure they render. The function is pure: same input,
//! same output, no mutation of the input.

use uuid::Uuid;

use crate::models::Comment;

/// One top-level comment together with its replies, in post order.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Partitions a flat, time-ordered comment list into top-level comments
/// with their replies attached.
///
/// Relative order is preserved on both levels: top-level comments keep
/// their input order, and each parent's replies keep theirs. A reply whose
/// parent is not in the input (deleted, or a data anomaly) is dropped from
/// the output entirely rather than promoted or shown as an orphan.
pub fn build_threads(comments: &[Comment]) -> Vec<CommentThread> {
    let mut threads: Vec<CommentThread> = Vec::new();
    let mut index_of: std::collections::HashMap<Uuid, usize> = std::collections::HashMap::new();

    for comment in comments {
        if comment.parent_comment_id.is_none() {
            index_of.insert(comment.id, threads.len());
            threads.push(CommentThread {
                comment: comment.clone(),
                replies: Vec::new(),
            });
        }
    }

    for comment in comments {
        if let Some(parent_id) = comment.parent_comment_id {
            if let Some(&i) = index_of.get(&parent_id) {
                threads[i].replies.push(comment.clone());
            }
            // Orphaned reply: parent was deleted, drop it from view.
        }
    }

    threads
}
