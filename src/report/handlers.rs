use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::coverage::CoverageEngine;

pub async fn get_report(State(engine): State<Arc<CoverageEngine>>) -> Response {
    match engine.to_json_string() {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize coverage report");
            (
                StatusCode::BAD_GATEWAY,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                format!("cannot serialize coverage report: {}", e),
            )
                .into_response()
        }
    }
}
