//! Monitoring config and stack reachability

use axum::extract::State;
use axum::response::Json;
use axum_extra::extract::WithRejection;
use lempman_core::MonitoringConfig;
use lempman_health::MonitoringStackStatus;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{ApiError, ApiResult, Context};
use crate::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub struct SavedConfig {
    pub config: MonitoringConfig,
}

pub async fn get_config(State(state): State<AppState>) -> ApiResult<MonitoringConfig> {
    let config = state
        .monitoring_config()
        .context("Failed to load monitoring config")?;
    Ok(Json(ApiResponse::ok(config)))
}

pub async fn save_config(
    State(state): State<AppState>,
    WithRejection(Json(update), _): WithRejection<Json<Value>, ApiError>,
) -> ApiResult<SavedConfig> {
    let config = MonitoringConfig::from_update(&update).context("Failed to save monitoring config")?;
    config
        .save(&state.settings.monitoring_path())
        .context("Failed to save monitoring config")?;

    info!("Monitoring config updated");
    Ok(Json(ApiResponse::ok(SavedConfig { config })))
}

pub async fn stack_status(State(state): State<AppState>) -> ApiResult<MonitoringStackStatus> {
    let status = state.endpoints.stack(&state.settings.monitoring).await;
    Ok(Json(ApiResponse::ok(status)))
}
