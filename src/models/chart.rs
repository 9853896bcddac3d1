use serde::Serialize;

pub const UP_COLOR: &str = "#00B050";
pub const DOWN_COLOR: &str = "#FF0000";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub stock_info: ChartStockInfo,
    pub candlestick: Vec<Candle>,
    pub volume: Vec<VolumeBar>,
    /// Close with the 5/25/50/75-day moving averages.
    pub line_chart: SeriesChart,
    /// Close, VWAP and short moving averages of price and volume.
    pub ma_golden_cross: SeriesChart,
    pub bollinger_bands: SeriesChart,
    pub rsi: SeriesChart,
    pub macd: SeriesChart,
    pub technical: TechnicalSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartStockInfo {
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub last_update: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeBar {
    pub date: String,
    pub volume: i64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesChart {
    pub dates: Vec<String>,
    pub series: Vec<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: &'static str,
    pub data: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
}

impl ChartSeries {
    pub fn new(name: &'static str, data: Vec<Option<f64>>) -> Self {
        Self { name, data, color: None }
    }

    pub fn colored(name: &'static str, data: Vec<Option<f64>>, color: &'static str) -> Self {
        Self { name, data, color: Some(color) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalSummary {
    pub indicators: LatestIndicators,
}

/// Last-row indicator values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatestIndicators {
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub bollinger_bands: BandValues,
    pub price: Option<f64>,
    pub price_above_ma25: Option<bool>,
    pub price_above_ma50: Option<bool>,
    pub price_above_ma75: Option<bool>,
    /// Latest volume divided by its 20-day average.
    pub volume_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BandValues {
    pub upper: Option<f64>,
    pub middle: Option<f64>,
    pub lower: Option<f64>,
}
