//! LEMP Manager Web Console
//!
//! JSON API under `/api`, session auth via an HTTP-only cookie or a bearer
//! token, and a small embedded UI served for the console pages.

pub mod auth;
pub mod error;
mod handlers;
pub mod state;
pub mod tracker;
mod ui;

use axum::{
    http::{header::HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::{ApiError, ApiResult};
pub use state::AppState;
pub use tracker::{spawn_watcher, StatusTracker};

use lempman_core::DEFAULT_CORS_ORIGIN;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Console pages that need a session
const GATED_PAGES: &[&str] = &[
    "/dashboard",
    "/deployment",
    "/logs",
    "/monitoring",
    "/notifications",
    "/users",
];

fn cors_layer(origin: &str) -> CorsLayer {
    // Credentials rule out the wildcard origin
    let origin = match origin.parse::<HeaderValue>() {
        Ok(value) if value != "*" => value,
        _ => {
            warn!("Invalid CORS origin '{}', using {}", origin, DEFAULT_CORS_ORIGIN);
            HeaderValue::from_static(DEFAULT_CORS_ORIGIN)
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Create the console router
pub fn create_router(state: AppState) -> Router {
    use handlers::{deployment, health_check, logs, monitoring, notifications, session, sites, system, users};

    let cors = cors_layer(&state.settings.cors_origin);

    // Routes that require a session
    let protected_routes = Router::new()
        // Account
        .route("/api/auth/me", get(session::me))
        // Sites
        .route(
            "/api/sites",
            get(sites::list).post(sites::upsert).delete(sites::delete_by_body),
        )
        .route(
            "/api/sites/:id",
            get(sites::get).put(sites::update).delete(sites::delete),
        )
        // Users (admin only)
        .route(
            "/api/users",
            get(users::list)
                .post(users::create)
                .put(users::reset_password)
                .delete(users::delete_by_body),
        )
        .route("/api/users/:username", delete(users::delete))
        // Status
        .route("/api/system/status", get(system::status))
        .route("/api/services/:name/status", get(system::service_status))
        // Logs
        .route("/api/logs", get(logs::search))
        // Monitoring
        .route(
            "/api/monitoring/config",
            get(monitoring::get_config).post(monitoring::save_config),
        )
        .route("/api/monitoring/status", get(monitoring::stack_status))
        // Notifications
        .route("/api/notifications/alerts", get(notifications::alerts))
        .route("/api/notifications/status", get(notifications::status))
        .route(
            "/api/notifications/telegram",
            get(notifications::get_telegram)
                .post(notifications::save_telegram)
                .put(notifications::test_telegram),
        )
        // Deployment
        .route("/api/deployment/check", post(deployment::check))
        .route("/api/deployment/install", post(deployment::install))
        .route_layer(middleware::from_fn_with_state(state.clone(), crate::auth::require_auth));

    // Public routes
    let public_routes = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/auth/login", post(session::login))
        // PUT checks the session itself; the path is shared with login
        .route(
            "/api/auth",
            post(session::login)
                .put(session::change_password)
                .delete(session::logout),
        )
        .route("/", get(ui::login_page));

    let pages = GATED_PAGES
        .iter()
        .fold(Router::new(), |router, page| router.route(page, get(ui::console_page)))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_page_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(pages)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the console until the listener fails
pub async fn start_server(state: AppState, bind_addr: &str) -> std::io::Result<()> {
    let app = create_router(state);

    info!("Starting LEMP Manager console on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use testutil::TestApp;

    #[test]
    fn test_api_response_ok() {
        let resp = ApiResponse::ok("test");
        assert!(resp.success);
        assert_eq!(resp.data, Some("test"));
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_api_response_err() {
        let resp = ApiResponse::<()>::err("error message");
        assert!(!resp.success);
        assert!(resp.data.is_none());
        assert_eq!(resp.error, Some("error message".to_string()));
    }

    #[tokio::test]
    async fn test_cors_wildcard_falls_back_to_default_origin() {
        use tower::{Layer, ServiceExt};

        let service = cors_layer("*").layer(tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, std::convert::Infallible>(axum::response::Response::new(Body::empty()))
        }));

        let response = service
            .oneshot(
                Request::get("/api/health")
                    .header("origin", DEFAULT_CORS_ORIGIN)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            DEFAULT_CORS_ORIGIN
        );
        assert_eq!(response.headers()["access-control-allow-credentials"], "true");
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = TestApp::new().await;
        let (status, body) = app.get("/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_api_requires_session() {
        let app = TestApp::new().await;
        let (status, body) = app.get("/api/sites", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = app.get("/api/sites", Some("not-a-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_gated_page_redirects_without_session() {
        let app = TestApp::new().await;
        let response = app
            .send(Request::get("/dashboard").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/");
    }

    #[tokio::test]
    async fn test_gated_page_served_with_session() {
        let app = TestApp::new().await;
        let token = app.login("admin", "admin").await;

        let response = app
            .send(
                Request::get("/users")
                    .header("cookie", format!("auth={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_page_redirects_with_session() {
        let app = TestApp::new().await;
        let token = app.login("admin", "admin").await;

        let response = app
            .send(
                Request::get("/")
                    .header("cookie", format!("auth={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/dashboard");

        let response = app.send(Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
