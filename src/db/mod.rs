//! Read-only access to the local securities database.
//!
//! Rows come back as [`DbRow`]s: ordered cells decoded from each value's
//! runtime storage class, with a shared column-name list for named access.
//! No business logic lives here.

pub mod schema_queries;
pub mod stock_queries;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Decode, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use tracing::{debug, error, info};

/// One decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Numeric view of the cell. Text is accepted when it parses cleanly.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Null => None,
            SqlValue::Integer(v) => Some(*v as f64),
            SqlValue::Real(v) if v.is_finite() => Some(*v),
            SqlValue::Real(_) => None,
            SqlValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Null => None,
            SqlValue::Integer(v) => Some(*v),
            SqlValue::Real(v) if v.is_finite() => Some(v.trunc() as i64),
            SqlValue::Real(_) => None,
            SqlValue::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
            }
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Integer(v) => Some(v.to_string()),
            SqlValue::Real(v) => Some(v.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
        }
    }
}

/// A positional query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

static NULL_CELL: SqlValue = SqlValue::Null;

/// A result row: ordered cells plus the statement's column names.
#[derive(Debug, Clone)]
pub struct DbRow {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl DbRow {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn at(&self, index: usize) -> &SqlValue {
        self.values.get(index).unwrap_or(&NULL_CELL)
    }

    /// Cell by column name; unknown names read as NULL.
    pub fn get(&self, name: &str) -> &SqlValue {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.at(i))
            .unwrap_or(&NULL_CELL)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).as_f64()
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).as_i64()
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).as_text()
    }
}

/// Handle to the database file. Cloning is cheap; each operation acquires
/// its own connection and releases it when done.
#[derive(Clone)]
pub struct StockDatabase {
    pool: SqlitePool,
    path: PathBuf,
}

impl StockDatabase {
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self, sqlx::Error> {
        if !path.exists() {
            error!("Database file not found: {}", path.display());
            return Err(sqlx::Error::Configuration(
                format!("database file not found: {}", path.display()).into(),
            ));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!("Opened stock database (read-only) at {}", path.display());
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Wraps an existing pool, e.g. one opened read-write by a fixture.
    pub fn from_pool(pool: SqlitePool, path: PathBuf) -> Self {
        Self { pool, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn acquire(&self) -> Result<StockConnection, sqlx::Error> {
        let inner = self.pool.acquire().await?;
        Ok(StockConnection { inner })
    }

    pub async fn fetch_rows(&self, sql: &str, params: &[BindValue]) -> Result<Vec<DbRow>, sqlx::Error> {
        let mut conn = self.acquire().await?;
        conn.fetch_rows(sql, params).await
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// A connection checked out for the duration of one request.
pub struct StockConnection {
    inner: PoolConnection<Sqlite>,
}

impl StockConnection {
    pub async fn fetch_rows(&mut self, sql: &str, params: &[BindValue]) -> Result<Vec<DbRow>, sqlx::Error> {
        let query = params.iter().fold(sqlx::query(sql), |query, param| match param {
            BindValue::Integer(v) => query.bind(*v),
            BindValue::Real(v) => query.bind(*v),
            BindValue::Text(v) => query.bind(v.clone()),
        });

        let rows = query.fetch_all(&mut *self.inner).await.map_err(|e| {
            error!("Query failed: {} (params: {:?})", e, params);
            e
        })?;
        debug!("Query returned {} rows", rows.len());

        let columns: Arc<[String]> = match rows.first() {
            Some(first) => first
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect::<Vec<_>>()
                .into(),
            None => Vec::new().into(),
        };

        rows.iter()
            .map(|row| {
                let values = (0..row.len())
                    .map(|i| decode_cell(row, i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(DbRow::new(Arc::clone(&columns), values))
            })
            .collect()
    }
}

fn decode_cell(row: &SqliteRow, index: usize) -> Result<SqlValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }

    let storage = raw.type_info().name().to_ascii_uppercase();
    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => SqlValue::Integer(
            <i64 as Decode<Sqlite>>::decode(raw).map_err(sqlx::Error::Decode)?,
        ),
        "REAL" | "NUMERIC" => SqlValue::Real(
            <f64 as Decode<Sqlite>>::decode(raw).map_err(sqlx::Error::Decode)?,
        ),
        _ => SqlValue::Text(
            <String as Decode<Sqlite>>::decode(raw).map_err(sqlx::Error::Decode)?,
        ),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_numeric_views() {
        assert_eq!(SqlValue::Integer(7).as_f64(), Some(7.0));
        assert_eq!(SqlValue::Real(7.9).as_i64(), Some(7));
        assert_eq!(SqlValue::Text(" 12.5 ".into()).as_f64(), Some(12.5));
        assert_eq!(SqlValue::Text("12.5倍".into()).as_f64(), None);
        assert_eq!(SqlValue::Null.as_text(), None);
    }

    #[test]
    fn test_row_named_access_defaults_to_null() {
        let columns: Arc<[String]> = vec!["code".to_string(), "price".to_string()].into();
        let row = DbRow::new(columns, vec![SqlValue::Text("7203".into()), SqlValue::Real(2500.0)]);

        assert_eq!(row.text("code").as_deref(), Some("7203"));
        assert_eq!(row.f64("price"), Some(2500.0));
        assert!(row.get("missing").is_null());
        assert!(row.at(99).is_null());
    }

    #[tokio::test]
    async fn test_fetch_rows_decodes_storage_classes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.sqlite3");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().filename(&path).create_if_missing(true))
            .await
            .unwrap();
        sqlx::query("CREATE TABLE t (a INTEGER, b REAL, c TEXT, d)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t VALUES (1, 2.5, '15.5倍', NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let db = StockDatabase::from_pool(pool, path);
        let rows = db
            .fetch_rows("SELECT a, b, c, d FROM t WHERE a = ?", &[BindValue::Integer(1)])
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a"), &SqlValue::Integer(1));
        assert_eq!(rows[0].get("b"), &SqlValue::Real(2.5));
        assert_eq!(rows[0].get("c"), &SqlValue::Text("15.5倍".into()));
        assert!(rows[0].get("d").is_null());
    }
}
