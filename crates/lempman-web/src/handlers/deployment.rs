//! Deployment wizard steps

use axum::extract::State;
use axum::response::Json;
use axum_extra::extract::WithRejection;
use lempman_deploy::{CheckRequest, CheckResult, InstallRequest, InstallResult};

use crate::error::{ApiError, ApiResult, Context};
use crate::{ApiResponse, AppState};

pub async fn check(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CheckRequest>, ApiError>,
) -> ApiResult<CheckResult> {
    let result = state
        .deployer
        .check(&req)
        .await
        .context("Failed to run environment check")?;
    Ok(Json(ApiResponse::ok(result)))
}

pub async fn install(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<InstallRequest>, ApiError>,
) -> ApiResult<InstallResult> {
    let result = state
        .deployer
        .install(&req)
        .await
        .context("Failed to run installer")?;
    Ok(Json(ApiResponse::ok(result)))
}

#[cfg(test)]
mod tests {
    use crate::testutil::TestApp;
    use axum::http::StatusCode;
    use lempman_exec::{CommandOutput, ScriptedRunner};
    use serde_json::json;

    #[tokio::test]
    async fn test_check_with_key() {
        let runner = ScriptedRunner::new().on("/opt/installer/pre-check.sh", CommandOutput::ok("all good\n"));
        let app = TestApp::with_runner(runner, &["nginx"]).await;
        let token = app.login("admin", "admin").await;

        let (status, body) = app
            .request(
                "POST",
                "/api/deployment/check",
                Some(&token),
                Some(json!({
                    "host": "10.0.0.5",
                    "authType": "key",
                    "sshKey": "-----BEGIN KEY-----\nabc\n-----END KEY-----"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["success"], true);
        assert_eq!(body["data"]["checks"]["disk"], true);
        assert!(body["data"]["deploymentId"].is_string());
    }

    #[tokio::test]
    async fn test_check_rejects_bad_host() {
        let app = TestApp::new().await;
        let token = app.login("admin", "admin").await;

        let (status, _) = app
            .request(
                "POST",
                "/api/deployment/check",
                Some(&token),
                Some(json!({ "host": "x; reboot", "authType": "password", "password": "pw" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_script_is_generic_500() {
        let app = TestApp::new().await;
        let token = app.login("admin", "admin").await;

        let (status, body) = app
            .request(
                "POST",
                "/api/deployment/install",
                Some(&token),
                Some(json!({
                    "host": "shop.example.com",
                    "user": "deploy",
                    "components": { "nginx": true },
                    "versions": { "nginx": "1.24" }
                })),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to run installer");
    }
}
