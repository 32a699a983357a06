use axum::{
    extract::{Path, State},
    Extension, Json,
};
use notehall_comments::{CommentStore, Composer};
use notehall_shared::api::{CommentCountResponse, CreateCommentRequest};
use notehall_shared::{Comment, Identity};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::routes::AppState;

fn identity(user: &AuthUser) -> Identity {
    Identity::new(user.id, user.display_name.clone())
}

/// GET /api/v1/threads/:scope_id/comments
///
/// One-shot ordered read for callers that do not hold a feed open.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(scope_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let comments = state.store.fetch(scope_id).await?;
    Ok(Json(comments))
}

/// POST /api/v1/threads/:scope_id/comments
///
/// With `parent_comment_id` set this posts a reply, otherwise a new
/// top-level comment.
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(scope_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let composer = Composer::new(state.store.clone());
    let author = identity(&user);

    let comment = match req.parent_comment_id {
        Some(parent_id) => {
            composer
                .post_reply(scope_id, &author, &req.text, parent_id)
                .await?
        }
        None => composer.post_top_level(scope_id, &author, &req.text).await?,
    };

    Ok(Json(comment))
}

/// DELETE /api/v1/threads/:scope_id/comments/:comment_id
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((scope_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<(), AppError> {
    let composer = Composer::new(state.store.clone());
    composer
        .delete_comment(scope_id, comment_id, &identity(&user))
        .await?;
    Ok(())
}

/// GET /api/v1/threads/:scope_id/count
///
/// Reads the denormalized counter. List views use this to avoid holding a
/// subscription per row; it can lag the real count and the live feed wins
/// whenever both are visible.
pub async fn comment_count(
    State(state): State<AppState>,
    Path(scope_id): Path<Uuid>,
) -> Result<Json<CommentCountResponse>, AppError> {
    let comments = state.store.comment_count(scope_id).await?;

    Ok(Json(CommentCountResponse { scope_id, comments }))
}
