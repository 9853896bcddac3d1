//! Fixtures shared by unit tests.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::Executor;
use tempfile::TempDir;

use crate::db::StockDatabase;

pub const SEED_SQL: &str = include_str!("../tests/fixtures/stock_database.sql");

/// Writes the seed data to a fresh file and reopens it read-only.
/// Keep the returned directory alive for as long as the database is used.
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
