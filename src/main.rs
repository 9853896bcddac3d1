use tokio::net::TcpListener;

use kabuscope_backend::app;
use kabuscope_backend::config::AppConfig;
use kabuscope_backend::db::StockDatabase;
use kabuscope_backend::logging::{self, LoggingConfig};
use kabuscope_backend::services::llm_service::LlmService;
use kabuscope_backend::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    logging::init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env();

    // The dashboard still serves health and AI endpoints without a database.
    let db = match StockDatabase::open(&config.db_path, config.db_max_connections).await {
        Ok(db) => Some(db),
        Err(e) => {
            tracing::error!("Failed to open stock database at {}: {}", config.db_path.display(), e);
            None
        }
    };

    let llm = LlmService::new(&config.llm);

    let addr = config.bind_address();
    let state = AppState::new(config, db, llm);
    let app = app::create_app(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Kabuscope backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
