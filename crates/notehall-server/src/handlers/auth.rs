use axum::{extract::State, Extension, Json};
use notehall_shared::api::{AuthResponse, LoginRequest, RegisterRequest};
use notehall_shared::User;
use uuid::Uuid;

use crate::auth::{create_access_token, hash_password, verify_password, AuthUser};
use crate::error::AppError;
use crate::routes::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    // Validate input
    if req.email.is_empty() || req.password.is_empty() || req.display_name.is_empty() {
        return Err(AppError::Validation("All fields are required".to_string()));
    }

    if req.password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    // Check if email already exists
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(&state.db)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    // Hash password and create user
    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, display_name)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(user_id)
    .bind(&req.email)
    .bind(&password_hash)
    .bind(&req.display_name)
    .execute(&state.db)
    .await?;

    let access_token = create_access_token(
        user_id,
        &req.email,
        &req.display_name,
        &state.config.jwt_secret,
        state.config.jwt_expires_in,
    )?;

    Ok(Json(AuthResponse {
        access_token,
        user_id,
        display_name: req.display_name,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    // Find user by email
    let row: Option<(Uuid, String, String, String)> = sqlx::query_as(
        "SELECT id, email, password_hash, display_name FROM users WHERE email = $1",
    )
    .bind(&req.email)
    .fetch_optional(&state.db)
    .await?;

    let (user_id, email, password_hash, display_name) = row.ok_or(AppError::Unauthorized)?;

    // Verify password
    if !verify_password(&req.password, &password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let access_token = create_access_token(
        user_id,
        &email,
        &display_name,
        &state.config.jwt_secret,
        state.config.jwt_expires_in,
    )?;

    Ok(Json(AuthResponse {
        access_token,
        user_id,
        display_name,
    }))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>, AppError> {
    let row: Option<(Uuid, String, String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
        "SELECT id, email, display_name, created_at FROM users WHERE id = $1",
    )
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?;

    let (id, email, display_name, created_at) = row.ok_or(AppError::NotFound)?;

    Ok(Json(User {
        id,
        email,
        display_name,
        created_at,
    }))
}
