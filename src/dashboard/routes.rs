//! Dashboard HTTP routes
//!
//! - `GET /`: HTML table of the last run
//! - `GET /result.json`: the run report as JSON
//! - `GET /health`: liveness and overall outcome

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::page::render_html;
use crate::verify::RunReport;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub replication: String,
}

/// Create dashboard routes over a finished report
pub fn dashboard_routes(report: Arc<RunReport>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/result.json", get(result_handler))
        .route("/health", get(health_handler))
        .with_state(report)
}

async fn index_handler(State(report): State<Arc<RunReport>>) -> impl IntoResponse {
    Html(render_html(&report))
}

async fn result_handler(State(report): State<Arc<RunReport>>) -> impl IntoResponse {
    (StatusCode::OK, Json(report.as_ref().clone()))
}

async fn health_handler(State(report): State<Arc<RunReport>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        replication: if report.success { "ok" } else { "fail" }.to_string(),
    };

    (StatusCode::OK, Json(response))
}
