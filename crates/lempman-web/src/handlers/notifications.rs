//! Alertmanager passthrough and Telegram settings

use axum::extract::State;
use axum::response::Json;
use axum_extra::extract::WithRejection;
use lempman_health::EndpointStatus;
use lempman_notify::{ServiceEvent, TelegramConfig};
use tracing::info;

use crate::error::{ApiError, ApiResult, Context};
use crate::{ApiResponse, AppState};

pub async fn alerts(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    let alerts = state
        .endpoints
        .alerts(&state.settings.monitoring.alertmanager_url)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch alerts", e))?;

    Ok(Json(ApiResponse::ok(alerts)))
}

pub async fn status(State(state): State<AppState>) -> ApiResult<EndpointStatus> {
    let status = state
        .endpoints
        .alertmanager(&state.settings.monitoring.alertmanager_url)
        .await;
    Ok(Json(ApiResponse::ok(status)))
}

pub async fn get_telegram(State(state): State<AppState>) -> ApiResult<TelegramConfig> {
    let config = state
        .notifications
        .config()
        .context("Failed to load Telegram config")?;
    Ok(Json(ApiResponse::ok(config)))
}

pub async fn save_telegram(
    State(state): State<AppState>,
    WithRejection(Json(config), _): WithRejection<Json<TelegramConfig>, ApiError>,
) -> ApiResult<TelegramConfig> {
    state
        .notifications
        .save_config(&config)
        .context("Failed to save Telegram config")?;

    info!("Telegram notifications {}", if config.enabled { "enabled" } else { "disabled" });
    Ok(Json(ApiResponse::ok(config)))
}

/// Send a test message carrying the current nginx state
pub async fn test_telegram(State(state): State<AppState>) -> ApiResult<&'static str> {
    let nginx = state.probe.service("nginx").await;
    let event = ServiceEvent::Test {
        nginx_state: nginx.status.to_string(),
    };

    state
        .notifications
        .send_test(&event)
        .await
        .context("Failed to send test message")?;

    Ok(Json(ApiResponse::ok("Test message sent")))
}

#[cfg(test)]
mod tests {
    use crate::testutil::TestApp;
    use axum::http::StatusCode;
    use lempman_exec::{CommandOutput, ScriptedRunner};
    use lempman_notify::MockNotifier;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_telegram_roundtrip() {
        let app = TestApp::new().await;
        let token = app.login("admin", "admin").await;

        let (_, body) = app.get("/api/notifications/telegram", Some(&token)).await;
        assert_eq!(body["data"]["enabled"], false);

        let (status, _) = app
            .request(
                "POST",
                "/api/notifications/telegram",
                Some(&token),
                Some(json!({ "enabled": true, "botToken": "", "chatId": "" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .request(
                "POST",
                "/api/notifications/telegram",
                Some(&token),
                Some(json!({ "enabled": true, "botToken": "123:abc", "chatId": "42" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = app.get("/api/notifications/telegram", Some(&token)).await;
        assert_eq!(body["data"]["botToken"], "123:abc");
    }

    #[tokio::test]
    async fn test_send_test_requires_config() {
        let app = TestApp::new().await;
        let token = app.login("admin", "admin").await;

        let (status, _) = app.request("PUT", "/api/notifications/telegram", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_test_message() {
        let runner = ScriptedRunner::new().on_args("systemctl", &["is-active", "nginx"], CommandOutput::ok("active\n"));
        let app = TestApp::with_runner(runner, &["nginx"]).await;
        let token = app.login("admin", "admin").await;
        app.enable_telegram();

        let (status, _) = app.request("PUT", "/api/notifications/telegram", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(app.notifier.was_message_sent("Nginx status: running").await);
    }

    #[tokio::test]
    async fn test_send_failure_is_bad_gateway() {
        let app = TestApp::with_notifier(Arc::new(MockNotifier::failing())).await;
        let token = app.login("admin", "admin").await;
        app.enable_telegram();

        let (status, body) = app.request("PUT", "/api/notifications/telegram", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Failed to send test message");
    }

    #[tokio::test]
    async fn test_alerts_unreachable() {
        let app = TestApp::new().await;
        let token = app.login("admin", "admin").await;

        let (status, _) = app.get("/api/notifications/alerts", Some(&token)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, body) = app.get("/api/notifications/status", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["running"], false);
    }
}
