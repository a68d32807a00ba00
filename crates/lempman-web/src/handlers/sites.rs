//! Hosted site records

use axum::extract::{Path, State};
use axum::response::Json;
use axum_extra::extract::WithRejection;
use lempman_core::{Site, SiteInput};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiResult, Context};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct DeleteSiteRequest {
    #[serde(default)]
    pub id: String,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Site>> {
    let sites = state.db.sites().list().await.context("Failed to list sites")?;
    Ok(Json(ApiResponse::ok(sites)))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Site> {
    let site = state
        .db
        .sites()
        .get(&id)
        .await
        .context("Failed to load site")?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;

    Ok(Json(ApiResponse::ok(site)))
}

/// Create without an id, update with one
pub async fn upsert(
    State(state): State<AppState>,
    WithRejection(Json(input), _): WithRejection<Json<SiteInput>, ApiError>,
) -> ApiResult<Site> {
    input.validate().context("Failed to save site")?;

    let site = match input.id.clone().filter(|id| !id.is_empty()) {
        Some(id) => save_existing(&state, &id, input).await?,
        None => {
            let site = state
                .db
                .sites()
                .create(move |id| input.clone().into_new_site(id))
                .await
                .context("Failed to save site")?;
            info!("Created site {} ({})", site.name, site.id);
            site
        }
    };

    Ok(Json(ApiResponse::ok(site)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(input), _): WithRejection<Json<SiteInput>, ApiError>,
) -> ApiResult<Site> {
    input.validate().context("Failed to save site")?;
    let site = save_existing(&state, &id, input).await?;
    Ok(Json(ApiResponse::ok(site)))
}

async fn save_existing(state: &AppState, id: &str, input: SiteInput) -> Result<Site, ApiError> {
    let repo = state.db.sites();
    let existing = repo
        .get(id)
        .await
        .context("Failed to save site")?
        .ok_or_else(|| ApiError::not_found("Site not found"))?;

    let site = input.apply_to(&existing);
    if !repo.update(&site).await.context("Failed to save site")? {
        return Err(ApiError::not_found("Site not found"));
    }

    info!("Updated site {} ({})", site.name, site.id);
    Ok(site)
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<serde_json::Value> {
    remove(&state, &id).await
}

pub async fn delete_by_body(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<DeleteSiteRequest>, ApiError>,
) -> ApiResult<serde_json::Value> {
    if req.id.is_empty() {
        return Err(ApiError::bad_request("Site id is required"));
    }
    remove(&state, &req.id).await
}

async fn remove(state: &AppState, id: &str) -> ApiResult<serde_json::Value> {
    if !state.db.sites().delete(id).await.context("Failed to delete site")? {
        return Err(ApiError::not_found("Site not found"));
    }

    info!("Deleted site {}", id);
    Ok(Json(ApiResponse::ok(json!({ "deleted": id }))))
}
