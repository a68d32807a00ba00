//! Console user management, admin only

use axum::extract::{Path, State};
use axum::response::Json;
use axum::Extension;
use axum_extra::extract::WithRejection;
use lempman_core::{validate_username, Role, User, DEFAULT_ADMIN_USERNAME};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth::{self, Session};
use crate::error::{ApiError, ApiResult, Context};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserRequest {
    #[serde(default)]
    pub username: String,
}

pub async fn list(State(state): State<AppState>, Extension(session): Extension<Session>) -> ApiResult<Vec<User>> {
    session.require_admin()?;
    let users = state.db.users().list().await.context("Failed to list users")?;
    Ok(Json(ApiResponse::ok(users)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    WithRejection(Json(req), _): WithRejection<Json<CreateUserRequest>, ApiError>,
) -> ApiResult<User> {
    session.require_admin()?;

    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }
    if !validate_username(&req.username) {
        return Err(ApiError::bad_request(
            "Username may only contain letters, digits, '.', '_' and '-'",
        ));
    }
    let role = match req.role.as_deref().filter(|r| !r.is_empty()) {
        Some(role) => role.parse::<Role>().context("Failed to add user")?,
        None => Role::User,
    };

    let hash = auth::hash_password(&req.password, state.settings.bcrypt_cost)
        .await
        .context("Failed to add user")?;
    let user = User::new(req.username, hash, role);
    state.db.users().insert(&user).await.context("Failed to add user")?;

    info!("User '{}' created '{}' ({})", session.username, user.username, user.role);
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    WithRejection(Json(req), _): WithRejection<Json<ResetPasswordRequest>, ApiError>,
) -> ApiResult<&'static str> {
    session.require_admin()?;

    if req.username.is_empty() || req.new_password.is_empty() {
        return Err(ApiError::bad_request("Username and new password are required"));
    }

    let hash = auth::hash_password(&req.new_password, state.settings.bcrypt_cost)
        .await
        .context("Failed to reset password")?;
    if !state
        .db
        .users()
        .update_password(&req.username, &hash)
        .await
        .context("Failed to reset password")?
    {
        return Err(ApiError::not_found("User not found"));
    }

    info!("User '{}' reset the password of '{}'", session.username, req.username);
    Ok(Json(ApiResponse::ok("Password updated")))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(username): Path<String>,
) -> ApiResult<serde_json::Value> {
    session.require_admin()?;
    remove(&state, &session, &username).await
}

pub async fn delete_by_body(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    WithRejection(Json(req), _): WithRejection<Json<DeleteUserRequest>, ApiError>,
) -> ApiResult<serde_json::Value> {
    session.require_admin()?;
    if req.username.is_empty() {
        return Err(ApiError::bad_request("Username is required"));
    }
    remove(&state, &session, &req.username).await
}

async fn remove(state: &AppState, session: &Session, username: &str) -> ApiResult<serde_json::Value> {
    if username == DEFAULT_ADMIN_USERNAME {
        return Err(ApiError::bad_request("The default admin cannot be deleted"));
    }
    if !state.db.users().delete(username).await.context("Failed to delete user")? {
        return Err(ApiError::not_found("User not found"));
    }

    info!("User '{}' deleted '{}'", session.username, username);
    Ok(Json(ApiResponse::ok(json!({ "deleted": username }))))
}
