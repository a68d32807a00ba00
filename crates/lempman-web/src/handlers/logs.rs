//! Log search

use axum::extract::{Query, State};
use axum::response::Json;
use axum_extra::extract::WithRejection;
use lempman_logs::{LogPage, LogQuery};

use crate::error::{ApiError, ApiResult};
use crate::{ApiResponse, AppState};

pub async fn search(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<LogQuery>, ApiError>,
) -> ApiResult<LogPage> {
    let page = state
        .logs
        .search(&query)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch logs", e))?;

    Ok(Json(ApiResponse::ok(page)))
}
