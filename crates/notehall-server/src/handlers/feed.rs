use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use notehall_comments::CommentStore;
use notehall_shared::api::FeedMessage;
use uuid::Uuid;

use crate::routes::AppState;

/// GET /api/v1/threads/:scope_id/feed
///
/// Upgrades to a WebSocket that pushes one complete comment list per
/// change. The socket is the subscription handle: closing it (or the view
/// navigating away) releases the live query on the store side.
pub async fn comment_feed(
    State(state): State<AppState>,
    Path(scope_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_feed(state, scope_id, socket))
}

async fn run_feed(state: AppState, scope_id: Uuid, socket: WebSocket) {
    let mut snapshots = match state.store.subscribe(scope_id).await {
        Ok(snapshots) => snapshots,
        Err(err) => {
            // The client renders an empty thread and does not retry.
            tracing::warn!(%scope_id, %err, "comment feed subscription failed");
            return;
        }
    };

    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            snapshot = snapshots.next() => match snapshot {
                Some(comments) => {
                    if send(&mut write, FeedMessage::Snapshot { comments }).await.is_err() {
                        return;
                    }
                }
                None => return,
            },
            msg = read.next() => match msg {
                None | Some(Ok(Message::Close(_))) | Some(Err(_)) => return,
                Some(Ok(Message::Text(text))) if text == "ping" => {
                    if send(&mut write, FeedMessage::Pong).await.is_err() {
                        return;
                    }
                }
                Some(Ok(other)) => {
                    tracing::debug!(%scope_id, ?other, "ignoring unexpected feed message");
                }
            },
        }
    }
}

async fn send<W>(write: &mut W, msg: FeedMessage) -> Result<(), ()>
where
    W: futures::Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(&msg) {
        Ok(json) => json,
        Err(err) => {
            tracing::error!(%err, "failed serializing feed message");
            return Err(());
        }
    };
    write.send(Message::Text(json)).await.map_err(|_| ())
}
