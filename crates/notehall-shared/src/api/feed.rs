use serde::{Deserialize, Serialize};

use crate::models::Comment;

/// One message on the WebSocket comment feed.
///
/// Every data-bearing message carries the complete current comment list
/// for the subscribed scope, ordered by `created_at` ascending. Clients
/// replace their local list wholesale; there is no diff protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Snapshot { comments: Vec<Comment> },
    Pong,
}
