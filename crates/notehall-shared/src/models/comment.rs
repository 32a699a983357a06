use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single comment in a thread.
///
/// `scope_id` names the note or help-request the thread belongs to; a
/// comment never moves between scopes. `author_name` is captured at post
/// time and is not updated if the author later renames themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub scope_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub text: String,
    /// `None` for a top-level comment, `Some` for a reply to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }
}

/// Fields the caller supplies when posting; the store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub scope_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<Uuid>,
}
