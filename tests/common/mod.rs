#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::Executor;
use tempfile::TempDir;
use tower::ServiceExt;

use kabuscope_backend::app::create_app;
use kabuscope_backend::config::{AppConfig, LlmSettings};
use kabuscope_backend::db::StockDatabase;
use kabuscope_backend::services::llm_service::LlmService;
use kabuscope_backend::state::AppState;

const SEED_SQL: &str = include_str!("../fixtures/stock_database.sql");

pub fn test_config(db_path: std::path::PathBuf) -> AppConfig {
    AppConfig {
        base_path: db_path.parent().map(|p| p.to_path_buf()).unwrap_or_default(),
        db_path,
        host: "127.0.0.1".to_string(),
        port: 0,
        allowed_origins: vec!["*".to_string()],
        db_max_connections: 2,
        environment: "test".to_string(),
        llm: LlmSettings::default(),
    }
}

pub async fn seeded_database() -> (TempDir, StockDatabase) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stock_database.sqlite3");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().filename(&path).create_if_missing(true))
        .await
        .unwrap();
    pool.execute(SEED_SQL).await.unwrap();
    pool.close().await;

    let db = StockDatabase::open(&path, 2).await.unwrap();
    (dir, db)
}

/// App over the seeded database with the LLM disabled.
pub async fn seeded_app() -> (TempDir, Router) {
    let (dir, db) = seeded_database().await;
    let config = test_config(db.path().to_path_buf());
    let state = AppState::new(config, Some(db), LlmService::disabled());
    (dir, create_app(state))
}

/// App whose database could not be opened.
pub fn app_without_database() -> Router {
    let config = test_config(std::path::PathBuf::from("/nonexistent/stock_database.sqlite3"));
    create_app(AppState::new(config, None, LlmService::disabled()))
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

pub async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
