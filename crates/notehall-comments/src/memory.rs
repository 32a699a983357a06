use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use notehall_shared::{Comment, NewComment};
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::{CommentStore, Snapshots};

const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

struct ScopeState {
    comments: Vec<Comment>,
    counter: i64,
    tx: broadcast::Sender<Vec<Comment>>,
    last_created_at: Option<DateTime<Utc>>,
}

impl ScopeState {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            comments: Vec::new(),
            counter: 0,
            tx,
            last_created_at: None,
        }
    }

    /// Store-assigned creation time, strictly increasing within the scope
    /// even when two appends land in the same clock tick.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let mut at = Utc::now();
        if let Some(last) = self.last_created_at {
            if at <= last {
                at = last + Duration::milliseconds(1);
            }
        }
        self.last_created_at = Some(at);
        at
    }

    fn publish(&self) {
        // No receivers is fine; the next subscriber fetches fresh state.
        let _ = self.tx.send(self.comments.clone());
    }
}

/// In-process [`CommentStore`] with per-scope broadcast fan-out.
///
/// Backs the core crate's tests and doubles as the executable description
/// of the store semantics the server implements over Postgres.
pub struct MemoryStore {
    scopes: Mutex<HashMap<Uuid, ScopeState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            scopes: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn fetch(&self, scope_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let scopes = self.scopes.lock().await;
        Ok(scopes
            .get(&scope_id)
            .map(|s| s.comments.clone())
            .unwrap_or_default())
    }

    async fn subscribe(&self, scope_id: Uuid) -> Result<Snapshots, StoreError> {
        let mut scopes = self.scopes.lock().await;
        let scope = scopes.entry(scope_id).or_insert_with(ScopeState::new);
        // Receiver is registered under the same lock that guards writes,
        // so no change can slip between the initial state and the stream.
        let rx = scope.tx.subscribe();
        Ok(Snapshots::new(scope.comments.clone(), rx))
    }

    async fn append(&self, new: NewComment) -> Result<Comment, StoreError> {
        let mut scopes = self.scopes.lock().await;
        let scope = scopes.entry(new.scope_id).or_insert_with(ScopeState::new);

        if let Some(parent_id) = new.parent_comment_id {
            // Present-but-reply parents are rejected; absent parents are
            // tolerated (the parent may have been deleted in flight).
            if let Some(parent) = scope.comments.iter().find(|c| c.id == parent_id) {
                if parent.is_reply() {
                    return Err(StoreError::Validation(
                        "replies can only target top-level comments".to_string(),
                    ));
                }
            }
        }

        let comment = Comment {
            id: Uuid::new_v4(),
            scope_id: new.scope_id,
            author_id: new.author_id,
            author_name: new.author_name,
            text: new.text,
            parent_comment_id: new.parent_comment_id,
            created_at: scope.next_created_at(),
        };
        scope.comments.push(comment.clone());
        scope.publish();
        Ok(comment)
    }

    async fn delete(
        &self,
        scope_id: Uuid,
        comment_id: Uuid,
        acting_author_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut scopes = self.scopes.lock().await;
        let scope = scopes.get_mut(&scope_id).ok_or(StoreError::NotFound)?;

        let pos = scope
            .comments
            .iter()
            .position(|c| c.id == comment_id)
            .ok_or(StoreError::NotFound)?;
        if scope.comments[pos].author_id != acting_author_id {
            return Err(StoreError::PermissionDenied);
        }

        // No cascade: replies to a deleted top-level comment stay in the
        // store and are hidden by thread reconstruction.
        scope.comments.remove(pos);
        scope.publish();
        Ok(())
    }

    async fn bump_comment_count(&self, scope_id: Uuid, delta: i64) -> Result<(), StoreError> {
        let mut scopes = self.scopes.lock().await;
        let scope = scopes.entry(scope_id).or_insert_with(ScopeState::new);
        scope.counter += delta;
        Ok(())
    }

    async fn comment_count(&self, scope_id: Uuid) -> Result<i64, StoreError> {
        let scopes = self.scopes.lock().await;
        Ok(scopes.get(&scope_id).map(|s| s.counter).unwrap_or(0))
    }
}
