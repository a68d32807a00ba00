//! Session tokens, cookies, password hashing and the auth middleware

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lempman_core::{Error, Result, Role, User, AUTH_COOKIE, REMEMBER_ME_TTL_DAYS, SESSION_TTL_HOURS};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// JWT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller, available to handlers behind [`require_auth`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub username: String,
    pub role: Role,
}

impl Session {
    pub fn require_admin(&self) -> std::result::Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin role required"))
        }
    }
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            role: claims.role,
        }
    }
}

/// HS256 signing and verification keys
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Sign a token for `user` valid for `ttl`
    pub fn issue(&self, user: &User, ttl: Duration) -> Result<(String, Claims)> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.username.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::AuthError(format!("Failed to sign token: {}", e)))?;
        Ok((token, claims))
    }

    /// Check signature and expiry
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| Error::Unauthorized(e.to_string()))
    }
}

/// Token lifetime for a login
pub fn session_ttl(remember_me: bool) -> Duration {
    if remember_me {
        Duration::days(REMEMBER_ME_TTL_DAYS)
    } else {
        Duration::hours(SESSION_TTL_HOURS)
    }
}

pub fn session_cookie(token: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .secure(secure)
        .build()
}

/// An expired, empty session cookie
pub fn cleared_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::ZERO)
        .secure(secure)
        .build()
}

/// Bearer token if present, otherwise the session cookie
pub fn request_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(AUTH_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// The verified session carried by a request, if any
pub fn session_from(keys: &JwtKeys, headers: &HeaderMap) -> Option<Session> {
    let token = request_token(headers)?;
    match keys.verify(&token) {
        Ok(claims) => Some(claims.into()),
        Err(e) => {
            debug!("Rejected session token: {}", e);
            None
        }
    }
}

/// API guard: 401 JSON without a valid token
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match session_from(&state.keys, request.headers()) {
        Some(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        None => ApiError::unauthorized("Authentication required").into_response(),
    }
}

/// Page guard: back to the login page without a valid token
pub async fn require_page_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if session_from(&state.keys, request.headers()).is_some() {
        next.run(request).await
    } else {
        Redirect::to("/").into_response()
    }
}

/// bcrypt off the async runtime
pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| Error::AuthError(e.to_string()))?
        .map_err(|e| Error::AuthError(format!("Failed to hash password: {}", e)))
}

/// False for a wrong password or an unreadable hash
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}
