//! HTTP request handlers.

use super::AppState;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};

/// Text exposition of every registered series.
pub async fn handle_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.registry.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
