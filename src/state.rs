use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::StockDatabase;
use crate::errors::AppError;
use crate::services::ai_analysis_service::AiAnalysisService;
use crate::services::chart_service::ChartService;
use crate::services::llm_service::LlmService;
use crate::services::screening_service::ScreeningService;

/// Services built once at startup. Database-backed services are absent
/// when the database could not be opened.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Option<StockDatabase>,
    pub screening: Option<ScreeningService>,
    pub charts: Option<ChartService>,
    pub analysis: AiAnalysisService,
}

impl AppState {
    pub fn new(config: AppConfig, db: Option<StockDatabase>, llm: LlmService) -> Self {
        Self {
            config: Arc::new(config),
            screening: db.clone().map(ScreeningService::new),
            charts: db.clone().map(ChartService::new),
            db,
            analysis: AiAnalysisService::new(llm),
        }
    }

    pub fn database(&self) -> Result<&StockDatabase, AppError> {
        self.db
            .as_ref()
            .ok_or_else(|| AppError::ServiceUnavailable("Database".to_string()))
    }

    pub fn screening(&self) -> Result<&ScreeningService, AppError> {
        self.screening
            .as_ref()
            .ok_or_else(|| AppError::ServiceUnavailable("Screening service".to_string()))
    }

    pub fn charts(&self) -> Result<&ChartService, AppError> {
        self.charts
            .as_ref()
            .ok_or_else(|| AppError::ServiceUnavailable("Chart service".to_string()))
    }
}
