use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};

use crate::db::stock_queries;
use crate::errors::AppError;
use crate::models::analysis::StockAnalysis;
use crate::models::chart::ChartData;
use crate::models::screening::StockListResponse;
use crate::models::stock::SectorPerformance;
use crate::models::DataResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stocks", get(list_stocks))
        .route("/api/stocks/:code/chart", get(get_chart))
        .route("/api/stocks/:code/ai-analysis", get(get_ai_analysis))
        .route("/api/sectors/performance", get(get_sector_performance))
}

pub async fn list_stocks(State(state): State<AppState>) -> Result<Json<StockListResponse>, AppError> {
    info!("GET /api/stocks - Listing latest stocks");
    let data = state.screening()?.list_latest().await;
    Ok(Json(StockListResponse {
        status: "success",
        count: data.len(),
        data,
    }))
}

pub async fn get_chart(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DataResponse<ChartData>>, AppError> {
    info!("GET /api/stocks/{}/chart - Building chart data", code);
    let chart = state.charts()?
        .generate_chart_data(&code)
        .await
        .map_err(|e| {
            error!("Failed to build chart for {}: {}", code, e);
            e
        })?
        .ok_or_else(|| AppError::NotFound(format!("Chart data not found for {}", code)))?;
    Ok(Json(DataResponse::success(chart)))
}

pub async fn get_ai_analysis(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DataResponse<StockAnalysis>>, AppError> {
    info!("GET /api/stocks/{}/ai-analysis - Analyzing stock", code);
    let record = state.screening()?
        .find_stock(&code)
        .await
        .map_err(|e| {
            error!("Failed to load stock {} for analysis: {}", code, e);
            e
        })?
        .ok_or_else(|| AppError::NotFound(format!("Stock not found: {}", code)))?;

    let analysis = state.analysis.analyze_stock(&record).await;
    Ok(Json(DataResponse::success(StockAnalysis {
        stock_info: record,
        analysis,
    })))
}

pub async fn get_sector_performance(
    State(state): State<AppState>,
) -> Result<Json<Vec<SectorPerformance>>, AppError> {
    info!("GET /api/sectors/performance - Aggregating sectors");
    let sectors = stock_queries::sector_performance(state.database()?)
        .await
        .map_err(|e| {
            error!("Failed to aggregate sector performance: {}", e);
            e
        })?;
    Ok(Json(sectors))
}
