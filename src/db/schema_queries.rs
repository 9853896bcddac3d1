use tracing::{info, warn};

use crate::db::StockConnection;
use crate::models::capability::CapabilityMap;

/// Probes `stock_indicators` for its optional columns.
///
/// Never fails: a probe error yields an empty map, so every predicate and
/// projection that depends on an unconfirmed column is left out.
pub async fn probe_capabilities(conn: &mut StockConnection) -> CapabilityMap {
    match conn.fetch_rows("PRAGMA table_info(stock_indicators)", &[]).await {
        Ok(rows) => {
            let names: Vec<String> = rows.iter().filter_map(|r| r.text("name")).collect();
            let map = CapabilityMap::from_columns(names.iter().map(String::as_str));
            if map.is_empty() {
                warn!("stock_indicators table not found; indicator fields will be null");
            } else {
                info!("Indicator capabilities: {:?}", map);
            }
            map
        }
        Err(e) => {
            warn!("Capability probe failed, treating all optional columns as absent: {}", e);
            CapabilityMap::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StockDatabase;
    use crate::models::capability::Capability;
    use crate::test_support::seeded_database;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use sqlx::Executor;

    #[tokio::test]
    async fn test_probe_confirms_present_columns_only() {
        let (_dir, db) = seeded_database().await;
        let mut conn = db.acquire().await.unwrap();
        let caps = probe_capabilities(&mut conn).await;

        assert!(caps.has(Capability::IndicatorTable));
        assert!(caps.has(Capability::VolumeGoldenCross));
        assert!(caps.has(Capability::VwapGoldenCross));
        assert!(caps.has(Capability::MarginCategory));
        assert!(!caps.has(Capability::PriceGoldenCross));
        assert!(!caps.has(Capability::ShortRatio));
    }

    #[tokio::test]
    async fn test_missing_indicator_table_gives_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices_only.sqlite3");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().filename(&path).create_if_missing(true))
            .await
            .unwrap();
        pool.execute("CREATE TABLE stock_database (code TEXT, date TEXT, price REAL)")
            .await
            .unwrap();

        let db = StockDatabase::from_pool(pool, path);
        let mut conn = db.acquire().await.unwrap();
        assert!(probe_capabilities(&mut conn).await.is_empty());
    }
}
