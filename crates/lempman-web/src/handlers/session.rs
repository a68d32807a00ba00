//! Login, logout, password change and the current session

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use axum::Extension;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use lempman_core::{Role, User};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{self, Session};
use crate::error::{ApiError, ApiResult, Context};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub username: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>), ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let stored = state.db.users().get(&req.username).await.context("Failed to log in")?;
    let user = match stored {
        Some(user) if auth::verify_password(&req.password, &user.password_hash).await => user,
        _ => {
            warn!("Failed login for '{}'", req.username);
            return Err(ApiError::unauthorized("Invalid username or password"));
        }
    };

    state
        .db
        .users()
        .touch_last_login(&user.username)
        .await
        .context("Failed to log in")?;

    let ttl = auth::session_ttl(req.remember_me);
    let (token, claims) = state.keys.issue(&user, ttl).context("Failed to log in")?;
    info!("User '{}' logged in", user.username);

    let cookie = auth::session_cookie(token, ttl, state.settings.cookie_secure);
    let body = LoginResponse {
        username: user.username,
        role: user.role,
        expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or_default(),
    };
    Ok((jar.add(cookie), Json(ApiResponse::ok(body))))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<ApiResponse<&'static str>>) {
    let jar = jar.add(auth::cleared_cookie(state.settings.cookie_secure));
    (jar, Json(ApiResponse::ok("Logged out")))
}

pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<&'static str> {
    let session = auth::session_from(&state.keys, &headers)
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    let Json(req) = body?;

    if req.new_password.is_empty() {
        return Err(ApiError::bad_request("New password is required"));
    }

    let users = state.db.users();
    let user = users
        .get(&session.username)
        .await
        .context("Failed to change password")?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    if !auth::verify_password(&req.current_password, &user.password_hash).await {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let hash = auth::hash_password(&req.new_password, state.settings.bcrypt_cost)
        .await
        .context("Failed to change password")?;
    users
        .update_password(&user.username, &hash)
        .await
        .context("Failed to change password")?;

    info!("User '{}' changed their password", user.username);
    Ok(Json(ApiResponse::ok("Password updated")))
}

pub async fn me(State(state): State<AppState>, Extension(session): Extension<Session>) -> ApiResult<User> {
    let user = state
        .db
        .users()
        .get(&session.username)
        .await
        .context("Failed to load account")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::ok(user)))
}

#[cfg(test)]
mod tests {
    use crate::testutil::TestApp;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_login_sets_cookie() {
        let app = TestApp::new().await;
        let (status, cookie, body) = app
            .post_login(json!({ "username": "admin", "password": "admin" }))
            .await;

        assert_eq!(status, StatusCode::OK);
        let cookie = cookie.expect("session cookie");
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=86400"));
        assert_eq!(body["data"]["username"], "admin");
        assert_eq!(body["data"]["role"], "admin");
    }

    #[tokio::test]
    async fn test_wrong_login_sets_no_cookie() {
        let app = TestApp::new().await;

        let (status, cookie, _) = app
            .post_login(json!({ "username": "admin", "password": "nope" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(cookie.is_none());

        let (status, cookie, _) = app
            .post_login(json!({ "username": "ghost", "password": "admin" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(cookie.is_none());
    }

    #[tokio::test]
    async fn test_remember_me_extends_cookie() {
        let app = TestApp::new().await;
        let (_, cookie, _) = app
            .post_login(json!({ "username": "admin", "password": "admin", "rememberMe": true }))
            .await;
        assert!(cookie.unwrap().contains("Max-Age=604800"));
    }

    #[tokio::test]
    async fn test_login_then_authenticated_request() {
        let app = TestApp::new().await;
        let token = app.login("admin", "admin").await;

        let (status, body) = app.get("/api/auth/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "admin");
        assert!(body["data"]["lastLogin"].is_string());
        assert!(body["data"].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let app = TestApp::new().await;
        let (status, cookie, _) = app.request_with_cookie("DELETE", "/api/auth", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let cookie = cookie.unwrap();
        assert!(cookie.starts_with("auth=;") || cookie.starts_with("auth=\"\""));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_wrong_current_password_keeps_hash() {
        let app = TestApp::new().await;
        let token = app.login("admin", "admin").await;
        let before = app.state.db.users().get("admin").await.unwrap().unwrap().password_hash;

        let (status, _) = app
            .request(
                "PUT",
                "/api/auth",
                Some(&token),
                Some(json!({ "currentPassword": "wrong", "newPassword": "n3w" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let after = app.state.db.users().get("admin").await.unwrap().unwrap().password_hash;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_change_password() {
        let app = TestApp::new().await;
        let token = app.login("admin", "admin").await;

        let (status, _) = app
            .request(
                "PUT",
                "/api/auth",
                Some(&token),
                Some(json!({ "currentPassword": "admin", "newPassword": "" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .request(
                "PUT",
                "/api/auth",
                Some(&token),
                Some(json!({ "currentPassword": "admin", "newPassword": "n3w" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        app.login("admin", "n3w").await;
    }

    async fn put_text(app: &TestApp, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::put("/api/auth").header("content-type", "text/plain");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let response = app.send(builder.body(Body::from("newPassword=n3w")).unwrap()).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_non_json_password_change_checks_session_first() {
        let app = TestApp::new().await;

        let (status, body) = put_text(&app, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let token = app.login("admin", "admin").await;
        let (status, body) = put_text(&app, Some(&token)).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_login_body_uses_envelope() {
        let app = TestApp::new().await;
        let response = app
            .send(
                Request::post("/api/auth/login")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"username\":"))
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_change_password_requires_session() {
        let app = TestApp::new().await;
        let (status, _) = app
            .request(
                "PUT",
                "/api/auth",
                None,
                Some(json!({ "currentPassword": "admin", "newPassword": "n3w" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
