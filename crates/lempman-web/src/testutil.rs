//! Router harness for handler tests

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use lempman_core::{Role, Settings, User, DEFAULT_ADMIN_USERNAME};
use lempman_db::Database;
use lempman_exec::ScriptedRunner;
use lempman_notify::{MockNotifier, NotificationManager, TelegramConfig};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

use crate::{create_router, AppState};

const TEST_COST: u32 = 4;
const UNREACHABLE: &str = "http://127.0.0.1:1";

pub struct TestApp {
    pub state: AppState,
    pub notifier: Arc<MockNotifier>,
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(ScriptedRunner::new(), &["nginx", "mysql"], Arc::new(MockNotifier::new())).await
    }

    pub async fn with_runner(runner: ScriptedRunner, services: &[&str]) -> Self {
        Self::build(runner, services, Arc::new(MockNotifier::new())).await
    }

    pub async fn with_notifier(notifier: Arc<MockNotifier>) -> Self {
        Self::build(ScriptedRunner::new(), &["nginx", "mysql"], notifier).await
    }

    async fn build(runner: ScriptedRunner, services: &[&str], notifier: Arc<MockNotifier>) -> Self {
        let dir = tempdir().unwrap();

        let mut settings = Settings::with_config_dir(dir.path());
        settings.bcrypt_cost = TEST_COST;
        settings.command_timeout_secs = 5;
        settings.services = services.iter().map(|s| s.to_string()).collect();
        settings.nginx.status_url = format!("{}/nginx_status", UNREACHABLE);
        settings.monitoring.prometheus_url = UNREACHABLE.to_string();
        settings.monitoring.alertmanager_url = UNREACHABLE.to_string();
        settings.monitoring.grafana_url = UNREACHABLE.to_string();
        settings.opensearch.node = UNREACHABLE.to_string();
        settings.deploy.precheck_script = PathBuf::from("/opt/installer/pre-check.sh");
        settings.deploy.install_script = PathBuf::from("/opt/installer/install.sh");

        let db = Database::new(&settings.db_path()).await.unwrap();
        let hash = bcrypt::hash("admin", TEST_COST).unwrap();
        db.users()
            .ensure_default_admin(DEFAULT_ADMIN_USERNAME, || Ok(hash))
            .await
            .unwrap();

        let notifications = Arc::new(NotificationManager::with_notifier(
            settings.telegram_path(),
            notifier.clone(),
        ));
        let state = AppState::new(settings, db, "test-secret", Arc::new(runner), notifications).unwrap();

        Self {
            router: create_router(state.clone()),
            state,
            notifier,
            _dir: dir,
        }
    }

    pub async fn add_user(&self, username: &str, password: &str, role: Role) {
        let hash = bcrypt::hash(password, TEST_COST).unwrap();
        self.state
            .db
            .users()
            .insert(&User::new(username, hash, role))
            .await
            .unwrap();
    }

    pub fn enable_telegram(&self) {
        TelegramConfig::new(true, "123:abc", "42")
            .save(&self.state.settings.telegram_path())
            .unwrap();
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Status, `Set-Cookie` header and JSON body of a request
    pub async fn request_with_cookie(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Option<String>, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, cookie, json)
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, json) = self.request_with_cookie(method, path, token, body).await;
        (status, json)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", path, token, None).await
    }

    pub async fn post_login(&self, body: Value) -> (StatusCode, Option<String>, Value) {
        self.request_with_cookie("POST", "/api/auth/login", None, Some(body))
            .await
    }

    /// Log in and return the session token from the cookie
    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, cookie, _) = self
            .post_login(serde_json::json!({ "username": username, "password": password }))
            .await;
        assert_eq!(status, StatusCode::OK, "login as {} failed", username);

        let cookie = cookie.unwrap();
        cookie
            .split(';')
            .next()
            .and_then(|pair| pair.strip_prefix("auth="))
            .unwrap()
            .to_string()
    }
}
