use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::auth_middleware;
use crate::config::Config;
use crate::db::DbPool;
use crate::handlers::{auth as auth_handlers, comments as comment_handlers, feed as feed_handlers};
use crate::store::PgCommentStore;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub store: Arc<PgCommentStore>,
}

pub fn create_router(db: DbPool, config: Config, store: Arc<PgCommentStore>) -> Router {
    let state = AppState { db, config, store };

    // Public auth routes (no middleware)
    let public_auth_routes = Router::new()
        .route("/register", post(auth_handlers::register))
        .route("/login", post(auth_handlers::login));

    // Protected auth routes (need auth)
    let protected_auth_routes = Router::new()
        .route("/me", get(auth_handlers::me))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let auth_routes = Router::new()
        .merge(public_auth_routes)
        .merge(protected_auth_routes);

    // Thread routes: one comment thread per scope (note or help-request)
    let thread_routes = Router::new()
        .route("/comments", get(comment_handlers::list_comments))
        .route("/comments", post(comment_handlers::create_comment))
        .route(
            "/comments/:comment_id",
            delete(comment_handlers::delete_comment),
        )
        .route("/count", get(comment_handlers::comment_count))
        .route("/feed", get(feed_handlers::comment_feed));

    let protected_routes = Router::new()
        .nest("/threads/:scope_id", thread_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
