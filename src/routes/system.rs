use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub platform: &'static str,
    pub arch: &'static str,
    pub version: &'static str,
    pub base_path: String,
    pub db_path: String,
    pub environment: String,
    pub ai_enabled: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/system-info", get(system_info))
}

async fn system_info(State(state): State<AppState>) -> Json<SystemInfo> {
    info!("GET /api/system-info");
    let config = &state.config;
    Json(SystemInfo {
        platform: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        version: env!("CARGO_PKG_VERSION"),
        base_path: config.base_path.display().to_string(),
        db_path: config.db_path.display().to_string(),
        environment: config.environment.clone(),
        ai_enabled: state.analysis.is_enabled(),
    })
}
