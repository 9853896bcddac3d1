use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, info};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub services: ServiceHealth,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub database: &'static str,
    pub screening_service: &'static str,
    pub chart_service: &'static str,
    pub ai_analyzer: &'static str,
}

impl ServiceHealth {
    fn all_healthy(&self) -> bool {
        [self.database, self.screening_service, self.chart_service, self.ai_analyzer]
            .iter()
            .all(|s| *s == "healthy")
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
}

fn initialized<T>(service: &Option<T>) -> &'static str {
    if service.is_some() { "healthy" } else { "not_initialized" }
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    info!("GET /health - Health check");

    let database = match &state.db {
        Some(db) => match db.ping().await {
            Ok(()) => "healthy",
            Err(e) => {
                error!("Database health check failed: {}", e);
                "unhealthy"
            }
        },
        None => "not_initialized",
    };

    let services = ServiceHealth {
        database,
        screening_service: initialized(&state.screening),
        chart_service: initialized(&state.charts),
        // Always available: it degrades to the rule-based narrative.
        ai_analyzer: "healthy",
    };

    Json(HealthReport {
        status: if services.all_healthy() { "healthy" } else { "degraded" },
        timestamp: chrono::Utc::now().to_rfc3339(),
        services,
    })
}
