use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, warn};

use crate::models::analysis::{AiAnalyzeRequest, AiAnalyzeResponse, AiStatus};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/ai-analyze", post(analyze_screening_results))
        .route("/api/check-ai-status", get(check_ai_status))
}

pub async fn analyze_screening_results(
    State(state): State<AppState>,
    body: Result<Json<AiAnalyzeRequest>, JsonRejection>,
) -> (StatusCode, Json<AiAnalyzeResponse>) {
    info!("POST /api/ai-analyze - Analyzing screening results");

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected AI analysis body: {}", rejection);
            return (
                StatusCode::BAD_REQUEST,
                Json(AiAnalyzeResponse::rejected("Request body must be a JSON object")),
            );
        }
    };

    if request.query.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(AiAnalyzeResponse::rejected("Please enter a question")));
    }
    if request.screening_results.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(AiAnalyzeResponse::rejected("No screening results")));
    }

    let analysis = state
        .analysis
        .analyze_screening_results(&request.query, &request.screening_results, request.include_chart_data)
        .await;

    (StatusCode::OK, Json(AiAnalyzeResponse::analysis(analysis)))
}

/// Reports credential presence only; no request is made.
pub async fn check_ai_status(State(state): State<AppState>) -> Json<AiStatus> {
    info!("GET /api/check-ai-status");
    let status = if state.analysis.is_enabled() {
        AiStatus { connected: true, message: "API configured" }
    } else {
        AiStatus { connected: false, message: "API not configured (fallback mode)" }
    };
    Json(status)
}
