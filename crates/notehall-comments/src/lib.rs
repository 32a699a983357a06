//! Threaded-comment synchronization for NoteHall.
//!
//! One scope (a note or help-request) owns one comment thread. The store
//! behind [`CommentStore`] keeps the flat, time-ordered list; subscribers
//! receive the *complete* list on every change and replace their local
//! copy wholesale. Reconciliation by replacement trades bandwidth for the
//! absence of merge bugs: there are no diffs to apply out of order.
//!
//! [`Composer`] is the only write path. It takes the acting identity as an
//! explicit argument on every call; nothing in this crate reads an ambient
//! current user.

mod composer;
mod error;
mod feed;
mod memory;
mod store;

pub use composer::Composer;
pub use error::{CommentError, StoreError};
pub use feed::CommentFeed;
pub use memory::MemoryStore;
pub use store::{CommentStore, Snapshots};
