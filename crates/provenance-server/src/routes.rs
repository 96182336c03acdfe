//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use provenance_classifiers::RegistryPhase;
use provenance_core::Error;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::state::AppState;

/// Message returned for missing or blank input
pub const EMPTY_TEXT_MESSAGE: &str = "Please provide text to analyze";

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .route("/metrics", get(metrics))
        .route("/predict", post(predict))
        .fallback(fallback)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// 200 once every model is loaded, 503 before
async fn readiness(State(state): State<AppState>) -> Response {
    let phase = state.orchestrator.registry().phase();
    let status = match phase {
        RegistryPhase::Ready => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };

    let mut body = json!({ "status": phase.as_str() });
    if let Some(schema) = state.orchestrator.registry().schema() {
        body["schema"] = json!({
            "kind": format!("{:?}", schema.kind()),
            "width": schema.width(),
            "fingerprint": schema.short_fingerprint(),
        });
    }

    (status, Json(body)).into_response()
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

#[derive(Debug, Deserialize)]
struct PredictRequest {
    #[serde(default)]
    text: Option<String>,
}

async fn predict(
    State(state): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let text = match body {
        Ok(Json(PredictRequest { text: Some(text) })) if !text.trim().is_empty() => text,
        Ok(_) => return Err(AppError::EmptyText),
        Err(rejection) => return Err(AppError::InvalidRequest(rejection.body_text())),
    };

    metrics::counter!("provenance_http_requests_total", "route" => "predict").increment(1);
    let result = state.orchestrator.analyze(&text).await?;

    info!(
        label = %result.label(),
        votes = result.verdict().vote_count,
        "Prediction served"
    );
    Ok(Json(result).into_response())
}

async fn fallback() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Error responses of the HTTP boundary
#[derive(Debug)]
pub enum AppError {
    EmptyText,
    InvalidRequest(String),
    Analysis(Error),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Analysis(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::EmptyText => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": EMPTY_TEXT_MESSAGE })),
            )
                .into_response(),
            AppError::InvalidRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            AppError::Analysis(err) => {
                error!(kind = err.kind(), component = ?err.component(), "Analysis failed: {}", err);
                let body = json!({
                    "error": err.to_string(),
                    "kind": err.kind(),
                    "component": err.component(),
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
