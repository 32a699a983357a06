use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notehall_comments::{CommentStore, Snapshots, StoreError};
use notehall_shared::{Comment, NewComment};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::db::DbPool;

const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

type CommentRow = (
    Uuid,                  // id
    Uuid,                  // scope_id
    Uuid,                  // author_id
    String,                // author_name
    String,                // text
    Option<Uuid>,          // parent_comment_id
    chrono::DateTime<Utc>, // created_at
);

fn row_to_comment(row: CommentRow) -> Comment {
    Comment {
        id: row.0,
        scope_id: row.1,
        author_id: row.2,
        author_name: row.3,
        text: row.4,
        parent_comment_id: row.5,
        created_at: row.6,
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(anyhow::Error::new(e))
}

/// Postgres-backed [`CommentStore`] with in-process snapshot fan-out.
///
/// Every mutation re-reads the scope's full list and broadcasts it to all
/// live subscribers, so each WebSocket feed pushes complete lists rather
/// than diffs. Fan-out is per server process; cross-process deployments
/// would need a shared bus, which NoteHall does not currently run.
pub struct PgCommentStore {
    db: DbPool,
    feeds: RwLock<HashMap<Uuid, broadcast::Sender<Vec<Comment>>>>,
}

impl PgCommentStore {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            feeds: RwLock::new(HashMap::new()),
        }
    }

    async fn fetch_ordered(&self, scope_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            r#"
            SELECT id, scope_id, author_id, author_name, text, parent_comment_id, created_at
            FROM comments
            WHERE scope_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(scope_id)
        .fetch_all(&self.db)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(row_to_comment).collect())
    }

    /// Pushes the scope's current list to every live subscriber and prunes
    /// the channel once the last subscriber is gone.
    ///
    /// The lock is held across the read *and* the send. Two concurrent
    /// publishes that read first and raced for the channel afterwards
    /// could deliver the older snapshot last, regressing every subscriber
    /// until the next write to the scope; `MemoryStore` holds its state
    /// lock the same way.
    async fn publish(&self, scope_id: Uuid) {
        let mut feeds = self.feeds.write().await;

        let live = match feeds.get(&scope_id) {
            None => return,
            Some(tx) => tx.receiver_count() > 0,
        };
        if !live {
            feeds.remove(&scope_id);
            return;
        }

        let snapshot = match self.fetch_ordered(scope_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::error!(%scope_id, %err, "failed to read snapshot for fan-out");
                return;
            }
        };

        if let Some(tx) = feeds.get(&scope_id) {
            let _ = tx.send(snapshot);
        }
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn fetch(&self, scope_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        self.fetch_ordered(scope_id).await
    }

    async fn subscribe(&self, scope_id: Uuid) -> Result<Snapshots, StoreError> {
        // Register the receiver before the initial read. A write landing
        // in between shows up twice as a full snapshot, which wholesale
        // replacement makes harmless; a gap would not be.
        let rx = {
            let mut feeds = self.feeds.write().await;
            feeds
                .entry(scope_id)
                .or_insert_with(|| broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY).0)
                .subscribe()
        };

        let initial = self.fetch_ordered(scope_id).await?;
        Ok(Snapshots::new(initial, rx))
    }

    async fn append(&self, new: NewComment) -> Result<Comment, StoreError> {
        if let Some(parent_id) = new.parent_comment_id {
            // Single-level nesting is a data-model rule: a present parent
            // that is itself a reply rejects the write. An absent parent
            // is accepted, since it may have been deleted in flight.
            let parent: Option<(Option<Uuid>,)> = sqlx::query_as(
                "SELECT parent_comment_id FROM comments WHERE id = $1 AND scope_id = $2",
            )
            .bind(parent_id)
            .bind(new.scope_id)
            .fetch_optional(&self.db)
            .await
            .map_err(db_err)?;

            if let Some((Some(_),)) = parent {
                return Err(StoreError::Validation(
                    "replies can only target top-level comments".to_string(),
                ));
            }
        }

        let id = Uuid::new_v4();

        // Creation time comes from the database clock, nudged past the
        // scope's newest comment so ordering within a thread survives
        // same-instant appends and clock steps; `MemoryStore` applies the
        // same guard in `next_created_at`.
        let (created_at,): (DateTime<Utc>,) = sqlx::query_as(
            r#"
            INSERT INTO comments (id, scope_id, author_id, author_name, text, parent_comment_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, GREATEST(
                clock_timestamp(),
                COALESCE(
                    (SELECT MAX(created_at) + INTERVAL '1 millisecond'
                     FROM comments WHERE scope_id = $2),
                    clock_timestamp()
                )
            ))
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(new.scope_id)
        .bind(new.author_id)
        .bind(&new.author_name)
        .bind(&new.text)
        .bind(new.parent_comment_id)
        .fetch_one(&self.db)
        .await
        .map_err(db_err)?;

        self.publish(new.scope_id).await;

        Ok(Comment {
            id,
            scope_id: new.scope_id,
            author_id: new.author_id,
            author_name: new.author_name,
            text: new.text,
            parent_comment_id: new.parent_comment_id,
            created_at,
        })
    }

    async fn delete(
        &self,
        scope_id: Uuid,
        comment_id: Uuid,
        acting_author_id: Uuid,
    ) -> Result<(), StoreError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT author_id FROM comments WHERE id = $1 AND scope_id = $2",
        )
        .bind(comment_id)
        .bind(scope_id)
        .fetch_optional(&self.db)
        .await
        .map_err(db_err)?;

        let (author_id,) = row.ok_or(StoreError::NotFound)?;
        if author_id != acting_author_id {
            return Err(StoreError::PermissionDenied);
        }

        // No cascade: replies keep their dangling parent reference and are
        // hidden by thread reconstruction.
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.db)
            .await
            .map_err(db_err)?;

        self.publish(scope_id).await;

        Ok(())
    }

    async fn bump_comment_count(&self, scope_id: Uuid, delta: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO comment_counters (scope_id, comments)
            VALUES ($1, $2)
            ON CONFLICT (scope_id)
            DO UPDATE SET comments = comment_counters.comments + EXCLUDED.comments
            "#,
        )
        .bind(scope_id)
        .bind(delta)
        .execute(&self.db)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn comment_count(&self, scope_id: Uuid) -> Result<i64, StoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT comments FROM comment_counters WHERE scope_id = $1")
                .bind(scope_id)
                .fetch_optional(&self.db)
                .await
                .map_err(db_err)?;

        Ok(row.map(|(n,)| n).unwrap_or(0))
    }
}
