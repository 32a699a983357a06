use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
    /// Set to reply to a top-level comment; omit for a new thread root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<Uuid>,
}

/// Denormalized per-scope comment count, for list views that do not hold
/// a live subscription. Not the source of truth; the subscription's count
/// wins whenever both are visible.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentCountResponse {
    pub scope_id: Uuid,
    pub comments: i64,
}
