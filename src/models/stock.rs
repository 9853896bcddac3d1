use serde::Serialize;

/// One day of an instrument's price history, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    pub date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: f64,
    pub vwap: Option<f64>,
}

impl PriceBar {
    #[cfg(test)]
    pub fn with_close(date: impl Into<String>, close: f64, volume: f64) -> Self {
        Self {
            date: date.into(),
            open: Some(close),
            high: Some(close),
            low: Some(close),
            close,
            volume,
            vwap: None,
        }
    }
}

// Latest-date summary of a single instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSnapshot {
    pub code: String,
    pub name: Option<String>,
    pub date: String,
    pub price: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<i64>,
    pub market: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorPerformance {
    pub sector: String,
    pub stock_count: i64,
    pub avg_per: Option<f64>,
    pub avg_pbr: Option<f64>,
    pub avg_roe: Option<f64>,
    pub total_market_cap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateCount {
    pub date: String,
    pub count: i64,
}

/// Row counts of both tables for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateCoverage {
    pub stock_count: i64,
    pub indicator_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestDataDate {
    pub latest_date: String,
    pub count: i64,
}
