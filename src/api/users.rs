//! User administration endpoints. Admin only; role is fixed at creation.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{CreateUserRequest, User, UserResponse};
use crate::AppState;

use super::auth::{hash_password, validate_password_strength};
use super::error::{ApiError, ValidationErrorBuilder};
use super::require_admin;
use super::validation::{validate_email, validate_name, validate_phone};

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    require_admin(&user)?;

    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(Into::into).collect()))
}

/// Mechanics only, for assignment dropdowns
pub async fn list_mechanics(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    require_admin(&user)?;

    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE role = 'mechanic' ORDER BY full_name",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(users.into_iter().map(Into::into).collect()))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    require_admin(&user)?;

    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_email(&req.email) {
        errors.add("email", e);
    }
    if let Some(e) = validate_password_strength(&req.password) {
        errors.add("password", e);
    }
    if let Err(e) = validate_name(&req.full_name, "Name") {
        errors.add("full_name", e);
    }
    if let Err(e) = validate_phone(&req.phone) {
        errors.add("phone", e);
    }
    if req.role != "admin" && req.role != "mechanic" {
        errors.add("role", "Role must be 'admin' or 'mechanic'");
    }
    errors.finish()?;

    let id = Uuid::new_v4().to_string();
    let password_hash = hash_password(&req.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    sqlx::query(
        "INSERT INTO users (id, email, password_hash, full_name, role, phone) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&req.email)
    .bind(&password_hash)
    .bind(&req.full_name)
    .bind(&req.role)
    .bind(&req.phone)
    .execute(&state.db)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create user: {}", e);
        if e.to_string().contains("UNIQUE constraint failed") {
            ApiError::conflict("A user with this email already exists")
        } else {
            ApiError::database("Failed to create user")
        }
    })?;

    let created = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}
