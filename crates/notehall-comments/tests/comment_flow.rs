use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notehall_comments::{
    CommentError, CommentFeed, CommentStore, Composer, MemoryStore, Snapshots, StoreError,
};
use notehall_shared::{build_threads, Comment, Identity, NewComment};
use tokio::sync::mpsc;
use uuid::Uuid;

fn alice() -> Identity {
    Identity::new(Uuid::from_u128(0xA11CE), "alice")
}

fn bob() -> Identity {
    Identity::new(Uuid::from_u128(0xB0B), "bob")
}

async fn next_snapshot(rx: &mut mpsc::UnboundedReceiver<Vec<Comment>>) -> Vec<Comment> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for snapshot")
        .expect("feed closed unexpectedly")
}

async fn open_feed(
    store: Arc<MemoryStore>,
    scope_id: Uuid,
) -> (CommentFeed, mpsc::UnboundedReceiver<Vec<Comment>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let feed = CommentFeed::open(store, scope_id, move |list| {
        let _ = tx.send(list);
    })
    .await;
    (feed, rx)
}

#[tokio::test]
async fn feed_delivers_complete_lists_on_every_change() {
    let store = Arc::new(MemoryStore::new());
    let composer = Composer::new(store.clone());
    let scope = Uuid::from_u128(1);

    let (_feed, mut rx) = open_feed(store.clone(), scope).await;

    assert!(next_snapshot(&mut rx).await.is_empty());

    let first = composer.post_top_level(scope, &alice(), "hello").await.unwrap();
    let snap = next_snapshot(&mut rx).await;
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].id, first.id);

    composer.post_top_level(scope, &bob(), "hi back").await.unwrap();
    // Wholesale replace: the second snapshot carries the full list, not
    // just the new comment.
    let snap = next_snapshot(&mut rx).await;
    assert_eq!(snap.len(), 2);
    assert_eq!(snap[0].id, first.id);
}

#[tokio::test]
async fn replies_thread_under_their_parent() {
    let store = Arc::new(MemoryStore::new());
    let composer = Composer::new(store.clone());
    let scope = Uuid::from_u128(2);

    let top = composer.post_top_level(scope, &alice(), "anyone have notes?").await.unwrap();
    composer
        .post_reply(scope, &bob(), "uploading tonight", top.id)
        .await
        .unwrap();
    let other = composer.post_top_level(scope, &alice(), "also chapter 3?").await.unwrap();

    let threads = build_threads(&store.fetch(scope).await.unwrap());
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].comment.id, top.id);
    assert_eq!(threads[0].replies.len(), 1);
    assert_eq!(threads[0].replies[0].author_id, bob().id);
    assert_eq!(threads[1].comment.id, other.id);
}

#[tokio::test]
async fn scopes_are_isolated() {
    let store = Arc::new(MemoryStore::new());
    let composer = Composer::new(store.clone());
    let scope_x = Uuid::from_u128(0x10);
    let scope_y = Uuid::from_u128(0x20);

    composer.post_top_level(scope_x, &alice(), "in x").await.unwrap();

    let (_feed, mut rx) = open_feed(store.clone(), scope_y).await;
    assert!(next_snapshot(&mut rx).await.is_empty());

    composer.post_top_level(scope_y, &bob(), "in y").await.unwrap();
    let snap = next_snapshot(&mut rx).await;
    assert_eq!(snap.len(), 1);
    assert!(snap.iter().all(|c| c.scope_id == scope_y));
}

#[tokio::test]
async fn deleting_a_parent_hides_its_replies_but_keeps_them_stored() {
    let store = Arc::new(MemoryStore::new());
    let composer = Composer::new(store.clone());
    let scope = Uuid::from_u128(3);

    let top = composer.post_top_level(scope, &alice(), "root").await.unwrap();
    let reply = composer
        .post_reply(scope, &bob(), "attached", top.id)
        .await
        .unwrap();

    composer.delete_comment(scope, top.id, &alice()).await.unwrap();

    // The reply survives in the store but drops out of every rendered
    // reconstruction once its parent is gone.
    let list = store.fetch(scope).await.unwrap();
    assert!(list.iter().any(|c| c.id == reply.id));
    assert!(list.iter().all(|c| c.id != top.id));
    assert!(build_threads(&list).is_empty());
}

#[tokio::test]
async fn reply_racing_a_parent_delete_lands_but_never_renders() {
    let store = Arc::new(MemoryStore::new());
    let composer = Composer::new(store.clone());
    let scope = Uuid::from_u128(4);

    let top = composer.post_top_level(scope, &alice(), "soon gone").await.unwrap();
    composer.delete_comment(scope, top.id, &alice()).await.unwrap();

    // The reply is posted against an id that no longer exists.
    let reply = composer
        .post_reply(scope, &bob(), "too late", top.id)
        .await
        .unwrap();

    let list = store.fetch(scope).await.unwrap();
    assert!(list.iter().any(|c| c.id == reply.id));
    assert!(build_threads(&list).is_empty());
}

#[tokio::test]
async fn blank_text_is_rejected_before_reaching_the_store() {
    let store = Arc::new(MemoryStore::new());
    let composer = Composer::new(store.clone());
    let scope = Uuid::from_u128(5);

    let err = composer.post_top_level(scope, &alice(), "   \n").await.unwrap_err();
    assert!(matches!(err, CommentError::Validation(_)));

    assert!(store.fetch(scope).await.unwrap().is_empty());
    assert_eq!(store.comment_count(scope).await.unwrap(), 0);
}

#[tokio::test]
async fn only_the_author_may_delete() {
    let store = Arc::new(MemoryStore::new());
    let composer = Composer::new(store.clone());
    let scope = Uuid::from_u128(6);

    let c = composer.post_top_level(scope, &alice(), "mine").await.unwrap();
    let err = composer.delete_comment(scope, c.id, &bob()).await.unwrap_err();
    assert!(matches!(err, CommentError::PermissionDenied));

    // Nothing was mutated optimistically; the comment is still there.
    assert_eq!(store.fetch(scope).await.unwrap().len(), 1);
}

#[tokio::test]
async fn counter_tracks_posts_and_deletes() {
    let store = Arc::new(MemoryStore::new());
    let composer = Composer::new(store.clone());
    let scope = Uuid::from_u128(8);

    let a = composer.post_top_level(scope, &alice(), "one").await.unwrap();
    composer.post_top_level(scope, &alice(), "two").await.unwrap();
    composer.delete_comment(scope, a.id, &alice()).await.unwrap();

    assert_eq!(store.comment_count(scope).await.unwrap(), 1);
}

#[tokio::test]
async fn snapshots_never_regress_under_concurrent_posts() {
    let store = Arc::new(MemoryStore::new());
    let scope = Uuid::from_u128(11);

    let (_feed, mut rx) = open_feed(store.clone(), scope).await;
    assert!(next_snapshot(&mut rx).await.is_empty());

    let mut posters = Vec::new();
    for i in 0..4u32 {
        let composer = Composer::new(store.clone());
        posters.push(tokio::spawn(async move {
            let author = Identity::new(Uuid::from_u128(0x100 + i as u128), format!("user{i}"));
            for _ in 0..5 {
                composer
                    .post_top_level(scope, &author, "concurrent")
                    .await
                    .unwrap();
            }
        }));
    }
    for poster in posters {
        poster.await.unwrap();
    }

    // Each snapshot subsumes the one before it: with no deletes in play,
    // the list never shrinks and nothing once seen disappears. A store
    // whose fan-out raced its reads could deliver an older list after a
    // newer one and fail here.
    let mut seen: Vec<Comment> = Vec::new();
    loop {
        let snap = next_snapshot(&mut rx).await;
        assert!(
            snap.len() >= seen.len(),
            "snapshot regressed from {} to {} comments",
            seen.len(),
            snap.len()
        );
        for earlier in &seen {
            assert!(snap.iter().any(|c| c.id == earlier.id));
        }
        seen = snap;
        if seen.len() == 20 {
            break;
        }
    }
}

#[tokio::test]
async fn dropping_the_feed_stops_delivery() {
    let store = Arc::new(MemoryStore::new());
    let composer = Composer::new(store.clone());
    let scope = Uuid::from_u128(9);

    let (feed, mut rx) = open_feed(store.clone(), scope).await;
    assert!(next_snapshot(&mut rx).await.is_empty());

    drop(feed);

    composer.post_top_level(scope, &alice(), "unseen").await.unwrap();
    // The aborted task drops its callback, which closes the channel.
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if rx.recv().await.is_none() {
                break;
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "feed kept running after drop");
}

struct DeniedStore;

#[async_trait]
impl CommentStore for DeniedStore {
    async fn fetch(&self, _scope_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        Err(StoreError::PermissionDenied)
    }

    async fn subscribe(&self, _scope_id: Uuid) -> Result<Snapshots, StoreError> {
        Err(StoreError::PermissionDenied)
    }

    async fn append(&self, _new: NewComment) -> Result<Comment, StoreError> {
        Err(StoreError::PermissionDenied)
    }

    async fn delete(
        &self,
        _scope_id: Uuid,
        _comment_id: Uuid,
        _acting_author_id: Uuid,
    ) -> Result<(), StoreError> {
        Err(StoreError::PermissionDenied)
    }

    async fn bump_comment_count(&self, _scope_id: Uuid, _delta: i64) -> Result<(), StoreError> {
        Err(StoreError::PermissionDenied)
    }

    async fn comment_count(&self, _scope_id: Uuid) -> Result<i64, StoreError> {
        Err(StoreError::PermissionDenied)
    }
}

#[tokio::test]
async fn denied_subscription_degrades_to_an_empty_thread() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _feed = CommentFeed::open(Arc::new(DeniedStore), Uuid::from_u128(10), move |list| {
        let _ = tx.send(list);
    })
    .await;

    // One empty snapshot, then the channel closes; no retry.
    assert!(next_snapshot(&mut rx).await.is_empty());
    assert!(rx.recv().await.is_none());
}
