//! Host overview and per-service status

use axum::extract::{Path, State};
use axum::response::Json;
use lempman_core::ServiceState;
use lempman_health::{GenericServiceStatus, NginxStatus, ServiceMetrics, SystemStatus};
use serde::Serialize;
use tracing::warn;

use crate::error::{ApiError, ApiResult, Context};
use crate::{ApiResponse, AppState};

/// `nginx` has its own probe; everything else reports the unit state
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ServiceDetail {
    Nginx(NginxStatus),
    Generic(GenericServiceStatus),
}

pub async fn status(State(state): State<AppState>) -> ApiResult<SystemStatus> {
    let sites = state.db.sites().list().await.context("Failed to load system status")?;
    let report = state.probe.system_status(&sites, &state.settings.services).await;

    state.tracker.observe_all(&report.services).await;
    Ok(Json(ApiResponse::ok(report)))
}

pub async fn service_status(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<ServiceDetail> {
    if !state.settings.services.iter().any(|s| s == &name) {
        return Err(ApiError::not_found(format!("Unknown service: {}", name)));
    }

    let (observed, detail) = if name == "nginx" {
        let (observed, status) = state.nginx.status().await;
        (observed, ServiceDetail::Nginx(status))
    } else {
        let observed = state.probe.service(&name).await.status;
        let detail = ServiceDetail::Generic(GenericServiceStatus {
            is_running: observed.is_up(),
            metrics: ServiceMetrics { status: observed },
        });
        (observed, detail)
    };

    record(&state, &name, observed).await;
    Ok(Json(ApiResponse::ok(detail)))
}

async fn record(state: &AppState, name: &str, observed: ServiceState) {
    if let Err(e) = state.tracker.observe(name, observed).await {
        warn!("Failed to record status of {}: {}", name, e);
    }
}
