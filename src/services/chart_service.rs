use tracing::{info, warn};

use crate::db::stock_queries::{fetch_history, fetch_snapshot, CHART_HISTORY_DAYS};
use crate::db::StockDatabase;
use crate::errors::AppError;
use crate::models::chart::{
    BandValues, Candle, ChartData, ChartSeries, ChartStockInfo, LatestIndicators, SeriesChart,
    TechnicalSummary, VolumeBar, DOWN_COLOR, UP_COLOR,
};
use crate::models::stock::StockSnapshot;
use crate::services::indicator_engine::{self, IndicatorFrame, Series};

#[derive(Clone)]
pub struct ChartService {
    db: StockDatabase,
}

impl ChartService {
    pub fn new(db: StockDatabase) -> Self {
        Self { db }
    }

    /// `None` when the instrument has no latest snapshot or no history.
    pub async fn generate_chart_data(&self, code: &str) -> Result<Option<ChartData>, AppError> {
        let Some(snapshot) = fetch_snapshot(&self.db, code).await? else {
            warn!("No snapshot for {}", code);
            return Ok(None);
        };

        let history = fetch_history(&self.db, code, CHART_HISTORY_DAYS).await?;
        if history.is_empty() {
            warn!("No price history for {}", code);
            return Ok(None);
        }

        info!("Building chart for {} from {} bars", code, history.len());
        let frame = indicator_engine::compute(history);
        Ok(Some(assemble(&snapshot, &frame)))
    }
}

fn last(series: &Series) -> Option<f64> {
    series.last().copied().flatten()
}

/// Column of the frame's indicators, or all-null when there are none.
fn column(
    frame: &IndicatorFrame,
    pick: impl Fn(&indicator_engine::IndicatorSeries) -> &Series,
) -> Series {
    match &frame.indicators {
        Some(ind) => pick(ind).clone(),
        None => vec![None; frame.len()],
    }
}

pub fn assemble(snapshot: &StockSnapshot, frame: &IndicatorFrame) -> ChartData {
    let dates: Vec<String> = frame.bars.iter().map(|b| b.date.clone()).collect();
    let closes: Series = frame.bars.iter().map(|b| Some(b.close)).collect();
    let chart = |series: Vec<ChartSeries>| SeriesChart { dates: dates.clone(), series };

    let candlestick = frame
        .bars
        .iter()
        .map(|b| Candle {
            date: b.date.clone(),
            open: b.open.unwrap_or(0.0),
            high: b.high.unwrap_or(0.0),
            low: b.low.unwrap_or(0.0),
            close: b.close,
        })
        .collect();

    // First bar has no prior close and is drawn as down.
    let volume = frame
        .bars
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let up = i > 0 && b.close >= frame.bars[i - 1].close;
            VolumeBar {
                date: b.date.clone(),
                volume: b.volume as i64,
                color: if up { UP_COLOR } else { DOWN_COLOR },
            }
        })
        .collect();

    let ma5 = column(frame, |i| &i.ma5);
    let ma25 = column(frame, |i| &i.ma25);
    let ma50 = column(frame, |i| &i.ma50);
    let ma75 = column(frame, |i| &i.ma75);
    let volume_ma20 = column(frame, |i| &i.volume_ma20);
    let vwap: Series = frame.bars.iter().map(|b| b.vwap).collect();

    let line_chart = chart(vec![
        ChartSeries::new("stock_price", closes.clone()),
        ChartSeries::new("moving_average_5day", ma5.clone()),
        ChartSeries::new("moving_average_25day", ma25.clone()),
        ChartSeries::new("moving_average_50day", ma50.clone()),
        ChartSeries::new("moving_average_75day", ma75.clone()),
    ]);

    let ma_golden_cross = chart(vec![
        ChartSeries::colored("price", closes, "#0066CC"),
        ChartSeries::colored("vwap", vwap, "#FF6600"),
        ChartSeries::colored("moving_average_5day", ma5, "#00CC00"),
        ChartSeries::colored("volume_moving_average_5day", column(frame, |i| &i.volume_ma5), "#00AA00"),
        ChartSeries::colored("volume_moving_average_20day", volume_ma20.clone(), "#CC00CC"),
    ]);

    let bb_upper = column(frame, |i| &i.bb_upper);
    let bb_middle = column(frame, |i| &i.bb_middle);
    let bb_lower = column(frame, |i| &i.bb_lower);
    let rsi = column(frame, |i| &i.rsi);
    let macd = column(frame, |i| &i.macd);
    let signal = column(frame, |i| &i.signal);

    let latest_close = frame.bars.last().map(|b| b.close);
    let above = |ma: &Series| match (latest_close, last(ma)) {
        (Some(price), Some(avg)) => Some(price > avg),
        _ => None,
    };
    let volume_ratio = match (frame.bars.last(), last(&volume_ma20)) {
        (Some(bar), Some(avg)) if avg > 0.0 => Some(bar.volume / avg),
        _ => None,
    };

    let indicators = LatestIndicators {
        rsi: last(&rsi),
        macd: last(&macd),
        signal: last(&signal),
        bollinger_bands: BandValues {
            upper: last(&bb_upper),
            middle: last(&bb_middle),
            lower: last(&bb_lower),
        },
        price: latest_close,
        price_above_ma25: above(&ma25),
        price_above_ma50: above(&ma50),
        price_above_ma75: above(&ma75),
        volume_ratio,
    };

    ChartData {
        stock_info: ChartStockInfo {
            price: snapshot.price.unwrap_or(0.0),
            change: snapshot.change.unwrap_or(0.0),
            change_percent: snapshot.change_percent.unwrap_or(0.0),
            last_update: snapshot.date.clone(),
        },
        candlestick,
        volume,
        line_chart,
        ma_golden_cross,
        bollinger_bands: chart(vec![
            ChartSeries::new("upper_band", bb_upper),
            ChartSeries::new("middle_band", bb_middle),
            ChartSeries::new("lower_band", bb_lower),
        ]),
        rsi: chart(vec![ChartSeries::new("RSI", rsi)]),
        macd: chart(vec![
            ChartSeries::new("MACD", macd),
            ChartSeries::new("Signal", signal),
            ChartSeries::new("Histogram", column(frame, |i| &i.histogram)),
        ]),
        technical: TechnicalSummary { indicators },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stock::PriceBar;
    use crate::test_support::seeded_database;

    fn snapshot() -> StockSnapshot {
        StockSnapshot {
            code: "7203".into(),
            name: Some("トヨタ自動車".into()),
            date: "2024-01-30".into(),
            price: Some(129.0),
            change: None,
            change_percent: Some(0.8),
            volume: Some(1000),
            market: None,
        }
    }

    #[test]
    fn test_volume_colors_follow_prior_close() {
        let bars = vec![
            PriceBar::with_close("2024-01-01", 100.0, 10.0),
            PriceBar::with_close("2024-01-02", 101.0, 10.0),
            PriceBar::with_close("2024-01-03", 101.0, 10.0),
            PriceBar::with_close("2024-01-04", 99.0, 10.0),
        ];
        let chart = assemble(&snapshot(), &indicator_engine::compute(bars));
        let colors: Vec<_> = chart.volume.iter().map(|v| v.color).collect();
        assert_eq!(colors, vec![DOWN_COLOR, UP_COLOR, UP_COLOR, DOWN_COLOR]);
    }

    #[test]
    fn test_short_history_has_null_indicator_series() {
        let bars = vec![PriceBar::with_close("2024-01-01", 100.0, 10.0)];
        let chart = assemble(&snapshot(), &indicator_engine::compute(bars));

        assert_eq!(chart.rsi.series[0].data, vec![None]);
        assert_eq!(chart.line_chart.series[0].data, vec![Some(100.0)]);
        assert_eq!(chart.technical.indicators.price, Some(100.0));
        assert_eq!(chart.technical.indicators.price_above_ma25, None);
        assert_eq!(chart.stock_info.change, 0.0);
    }

    #[test]
    fn test_latest_summary_over_rising_series() {
        let bars: Vec<_> = (0..30)
            .map(|i| PriceBar::with_close(format!("2024-01-{:02}", i + 1), 100.0 + i as f64, 1000.0))
            .collect();
        let chart = assemble(&snapshot(), &indicator_engine::compute(bars));
        let latest = &chart.technical.indicators;

        assert_eq!(latest.price, Some(129.0));
        assert_eq!(latest.price_above_ma25, Some(true));
        assert_eq!(latest.price_above_ma50, None);
        assert_eq!(latest.rsi, None);
        assert_eq!(latest.volume_ratio, Some(1.0));
        assert!(latest.bollinger_bands.upper.unwrap() > latest.bollinger_bands.middle.unwrap());
        assert_eq!(chart.line_chart.dates.len(), 30);
        assert_eq!(chart.ma_golden_cross.series[0].color, Some("#0066CC"));
    }

    #[tokio::test]
    async fn test_generate_chart_data_from_database() {
        let (_dir, db) = seeded_database().await;
        let service = ChartService::new(db);

        let chart = service.generate_chart_data("7203").await.unwrap().unwrap();
        assert_eq!(chart.candlestick.len(), 30);
        assert_eq!(chart.stock_info.last_update, "2024-03-29");
        assert_eq!(chart.stock_info.price, 2590.0);
        assert!(chart.technical.indicators.rsi.is_some());

        assert!(service.generate_chart_data("0000").await.unwrap().is_none());
    }
}
