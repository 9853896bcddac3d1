use tracing::{debug, error, info};

use crate::db::schema_queries::probe_capabilities;
use crate::db::StockDatabase;
use crate::errors::AppError;
use crate::models::screening::{ScreeningFilters, ScreeningRecord};
use crate::services::query_builder::build_screening_query;
use crate::services::result_formatter::format_rows;

/// Runs screening requests end to end: probe, build, execute, format.
#[derive(Clone)]
pub struct ScreeningService {
    db: StockDatabase,
}

impl ScreeningService {
    pub fn new(db: StockDatabase) -> Self {
        Self { db }
    }

    /// One connection serves both the capability probe and the query.
    pub async fn run(&self, filters: &ScreeningFilters) -> Result<Vec<ScreeningRecord>, AppError> {
        let mut conn = self.db.acquire().await?;
        let capabilities = probe_capabilities(&mut conn).await;

        let query = build_screening_query(filters, &capabilities);
        debug!("Screening SQL ({} params):\n{}", query.params.len(), query.sql);

        let rows = conn.fetch_rows(&query.sql, &query.params).await?;
        Ok(format_rows(&rows))
    }

    /// Like [`run`](Self::run), but a failure is logged and reported as an
    /// empty result so the endpoint always answers with valid JSON.
    pub async fn screen(&self, filters: &ScreeningFilters) -> Vec<ScreeningRecord> {
        match self.run(filters).await {
            Ok(records) => {
                info!("Screening matched {} stocks", records.len());
                records
            }
            Err(e) => {
                error!("Screening failed, returning no results: {}", e);
                Vec::new()
            }
        }
    }

    /// Every instrument at the latest date.
    pub async fn list_latest(&self) -> Vec<ScreeningRecord> {
        self.screen(&ScreeningFilters::default()).await
    }

    /// Latest-date record for a single instrument.
    pub async fn find_stock(&self, code: &str) -> Result<Option<ScreeningRecord>, AppError> {
        let filters = ScreeningFilters {
            code: Some(code.to_string()),
            ..Default::default()
        };
        Ok(self.run(&filters).await?.into_iter().next())
    }
}
