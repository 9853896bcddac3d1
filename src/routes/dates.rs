use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

use crate::db::stock_queries;
use crate::errors::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/available-dates", get(available_dates))
        .route("/api/data-count-by-date", get(data_count_by_date))
        .route("/api/latest-data-date", get(latest_data_date))
}

pub async fn available_dates(State(state): State<AppState>) -> Result<Response, AppError> {
    info!("GET /api/available-dates");
    let dates = stock_queries::available_dates(state.database()?).await?;
    Ok(Json(json!({ "status": "success", "dates": dates })).into_response())
}

/// Per-date row counts, or both tables' counts for `?date=`.
pub async fn data_count_by_date(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let db = state.database()?;

    match params.get("date").map(|d| d.trim()).filter(|d| !d.is_empty()) {
        Some(date) => {
            info!("GET /api/data-count-by-date?date={}", date);
            chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                AppError::Validation(format!("Invalid date {:?}, expected YYYY-MM-DD", date))
            })?;
            let coverage = stock_queries::counts_for_date(db, date).await?;
            Ok(Json(json!({
                "status": "success",
                "stock_count": coverage.stock_count,
                "indicator_count": coverage.indicator_count,
            }))
            .into_response())
        }
        None => {
            info!("GET /api/data-count-by-date");
            let counts = stock_queries::data_counts_by_date(db).await?;
            Ok(Json(counts).into_response())
        }
    }
}

pub async fn latest_data_date(State(state): State<AppState>) -> Result<Response, AppError> {
    info!("GET /api/latest-data-date");
    let latest = stock_queries::latest_data_date(state.database()?)
        .await?
        .ok_or_else(|| AppError::NotFound("No data found".to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "latest_date": latest.latest_date,
        "count": latest.count,
    }))
    .into_response())
}
