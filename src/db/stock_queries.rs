use tracing::{error, warn};

use crate::db::{BindValue, DbRow, StockDatabase};
use crate::models::stock::{DateCount, DateCoverage, LatestDataDate, PriceBar, SectorPerformance, StockSnapshot};
use crate::services::screening_columns::{decorated_ratio_sql, ROE_SQL};

/// Calendar days of history shown on the chart.
pub const CHART_HISTORY_DAYS: i64 = 120;

/// Price history for `code` over the last `days` calendar days, anchored at
/// the table's latest date, ascending. Rows without a close are skipped.
pub async fn fetch_history(
    db: &StockDatabase,
    code: &str,
    days: i64,
) -> Result<Vec<PriceBar>, sqlx::Error> {
    let rows = db
        .fetch_rows(
            "SELECT date, open_price AS open, high_price AS high, low_price AS low,
                    price AS close, volume, vwap
             FROM stock_database
             WHERE code = ?
               AND price IS NOT NULL
               AND date >= date((SELECT MAX(date) FROM stock_database), '-' || ? || ' days')
             ORDER BY date ASC",
            &[BindValue::Text(code.to_string()), BindValue::Integer(days)],
        )
        .await?;

    Ok(rows.iter().filter_map(price_bar).collect())
}

fn price_bar(row: &DbRow) -> Option<PriceBar> {
    Some(PriceBar {
        date: row.text("date")?,
        open: row.f64("open"),
        high: row.f64("high"),
        low: row.f64("low"),
        close: row.f64("close")?,
        volume: row.f64("volume").unwrap_or(0.0),
        vwap: row.f64("vwap"),
    })
}

/// Latest-date snapshot of one instrument.
pub async fn fetch_snapshot(db: &StockDatabase, code: &str) -> Result<Option<StockSnapshot>, sqlx::Error> {
    let rows = db
        .fetch_rows(
            "SELECT code, name, date, price, change_amount, change_percent, volume, market
             FROM stock_database
             WHERE code = ?
               AND date = (SELECT MAX(date) FROM stock_database)",
            &[BindValue::Text(code.to_string())],
        )
        .await?;

    Ok(rows.first().and_then(|row| {
        Some(StockSnapshot {
            code: row.text("code")?,
            name: row.text("name"),
            date: row.text("date")?,
            price: row.f64("price"),
            change: row.f64("change_amount"),
            change_percent: row.f64("change_percent"),
            volume: row.i64("volume"),
            market: row.text("market"),
        })
    }))
}

pub async fn sector_performance(db: &StockDatabase) -> Result<Vec<SectorPerformance>, sqlx::Error> {
    let sql = format!(
        "SELECT sd.industry AS sector,
                COUNT(*) AS stock_count,
                AVG({per}) AS avg_per,
                AVG({pbr}) AS avg_pbr,
                AVG({roe}) AS avg_roe,
                SUM(sd.market_cap) AS total_market_cap
         FROM stock_database sd
         WHERE sd.date = (SELECT MAX(date) FROM stock_database)
           AND sd.industry IS NOT NULL
         GROUP BY sd.industry
         ORDER BY sd.industry",
        per = decorated_ratio_sql("sd.per"),
        pbr = decorated_ratio_sql("sd.pbr"),
        roe = ROE_SQL,
    );

    let rows = db.fetch_rows(&sql, &[]).await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(SectorPerformance {
                sector: row.text("sector")?,
                stock_count: row.i64("stock_count").unwrap_or(0),
                avg_per: row.f64("avg_per"),
                avg_pbr: row.f64("avg_pbr"),
                avg_roe: row.f64("avg_roe"),
                total_market_cap: row.f64("total_market_cap"),
            })
        })
        .collect())
}

/// Distinct dates, newest first.
pub async fn available_dates(db: &StockDatabase) -> Result<Vec<String>, sqlx::Error> {
    let rows = db
        .fetch_rows("SELECT DISTINCT date FROM stock_database ORDER BY date DESC", &[])
        .await?;
    Ok(rows.iter().filter_map(|r| r.text("date")).collect())
}

pub async fn data_counts_by_date(db: &StockDatabase) -> Result<Vec<DateCount>, sqlx::Error> {
    let rows = db
        .fetch_rows(
            "SELECT date, COUNT(*) AS count FROM stock_database GROUP BY date ORDER BY date DESC",
            &[],
        )
        .await?;
    Ok(rows
        .iter()
        .filter_map(|r| {
            Some(DateCount {
                date: r.text("date")?,
                count: r.i64("count").unwrap_or(0),
            })
        })
        .collect())
}

/// Row counts for one date. A missing indicator table counts as zero rows.
pub async fn counts_for_date(db: &StockDatabase, date: &str) -> Result<DateCoverage, sqlx::Error> {
    let params = [BindValue::Text(date.to_string())];

    let stock_count = db
        .fetch_rows("SELECT COUNT(*) AS n FROM stock_database WHERE date = ?", &params)
        .await?
        .first()
        .and_then(|r| r.i64("n"))
        .unwrap_or(0);

    let indicator_count = match db
        .fetch_rows("SELECT COUNT(*) AS n FROM stock_indicators WHERE date = ?", &params)
        .await
    {
        Ok(rows) => rows.first().and_then(|r| r.i64("n")).unwrap_or(0),
        Err(e) => {
            warn!("Indicator count unavailable for {}: {}", date, e);
            0
        }
    };

    Ok(DateCoverage { stock_count, indicator_count })
}

pub async fn latest_data_date(db: &StockDatabase) -> Result<Option<LatestDataDate>, sqlx::Error> {
    let rows = db
        .fetch_rows(
            "SELECT MAX(date) AS latest_date, COUNT(*) AS count
             FROM stock_database
             WHERE date = (SELECT MAX(date) FROM stock_database)",
            &[],
        )
        .await
        .map_err(|e| {
            error!("Failed to read latest data date: {}", e);
            e
        })?;

    Ok(rows.first().and_then(|row| {
        Some(LatestDataDate {
            latest_date: row.text("latest_date")?,
            count: row.i64("count").unwrap_or(0),
        })
    }))
}
