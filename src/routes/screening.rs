use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use crate::errors::AppError;
use crate::models::screening::{ScreeningFilters, ScreeningResponse};
use crate::services::filter_collector::{collect_basic_filters, collect_filters};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/enhanced-screening", get(enhanced_screening))
        .route("/api/screening", get(basic_screening))
}

async fn respond(state: &AppState, filters: ScreeningFilters) -> Result<Json<ScreeningResponse>, AppError> {
    let data = state.screening()?.screen(&filters).await;
    Ok(Json(ScreeningResponse {
        status: "success",
        count: data.len(),
        data,
        filters,
    }))
}

pub async fn enhanced_screening(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ScreeningResponse>, AppError> {
    info!("GET /api/enhanced-screening - {} params", params.len());
    respond(&state, collect_filters(&params)).await
}

pub async fn basic_screening(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ScreeningResponse>, AppError> {
    info!("GET /api/screening - {} params", params.len());
    respond(&state, collect_basic_filters(&params)).await
}
