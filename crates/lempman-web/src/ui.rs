//! Embedded console pages

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};

use crate::auth::session_from;
use crate::AppState;

/// Single page shell; the script picks the view from the path
const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Login form, or straight to the dashboard with a live session
pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if session_from(&state.keys, &headers).is_some() {
        Redirect::to("/dashboard").into_response()
    } else {
        Html(INDEX_HTML).into_response()
    }
}

pub async fn console_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}
