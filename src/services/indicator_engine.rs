//! Technical indicators over one instrument's ascending price history.
//!
//! Every series is aligned with the input bars: one value per date, `None`
//! during a rolling window's warm-up. Recomputed from scratch per call.

use crate::models::stock::PriceBar;
use crate::services::indicators::{bollinger_bands, macd, rsi, sma};

/// Below this many bars no indicators are computed.
pub const MIN_OBSERVATIONS: usize = 5;

pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_DEV: f64 = 2.0;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

pub type Series = Vec<Option<f64>>;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub ma5: Series,
    pub ma20: Series,
    pub ma25: Series,
    pub ma50: Series,
    pub ma75: Series,
    pub bb_upper: Series,
    pub bb_middle: Series,
    pub bb_lower: Series,
    pub rsi: Series,
    pub macd: Series,
    pub signal: Series,
    pub histogram: Series,
    pub volume_ma5: Series,
    pub volume_ma20: Series,
}

/// Bars plus their indicators. `indicators` is `None` for short histories.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    pub bars: Vec<PriceBar>,
    pub indicators: Option<IndicatorSeries>,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

pub fn compute(bars: Vec<PriceBar>) -> IndicatorFrame {
    if bars.len() < MIN_OBSERVATIONS {
        return IndicatorFrame { bars, indicators: None };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let (bb_middle, bb_upper, bb_lower) = bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEV);
    let macd = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let defined = |v: Vec<f64>| v.into_iter().map(Some).collect::<Series>();

    let indicators = IndicatorSeries {
        ma5: sma(&closes, 5),
        ma20: sma(&closes, 20),
        ma25: sma(&closes, 25),
        ma50: sma(&closes, 50),
        ma75: sma(&closes, 75),
        bb_upper,
        bb_middle,
        bb_lower,
        rsi: rsi(&closes, RSI_PERIOD),
        macd: defined(macd.macd),
        signal: defined(macd.signal),
        histogram: defined(macd.histogram),
        volume_ma5: sma(&volumes, 5),
        volume_ma20: sma(&volumes, 20),
    };

    IndicatorFrame {
        bars,
        indicators: Some(indicators),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(days: usize) -> Vec<PriceBar> {
        (0..days)
            .map(|i| PriceBar::with_close(format!("2024-01-{:02}", i + 1), 100.0 + i as f64, 1000.0))
            .collect()
    }

    #[test]
    fn test_short_history_is_returned_unchanged() {
        let bars = rising(4);
        let frame = compute(bars.clone());
        assert_eq!(frame.bars, bars);
        assert!(frame.indicators.is_none());
    }

    #[test]
    fn test_series_align_with_bars() {
        let frame = compute(rising(30));
        let ind = frame.indicators.unwrap();
        for series in [&ind.ma5, &ind.ma75, &ind.rsi, &ind.macd, &ind.bb_upper, &ind.volume_ma20] {
            assert_eq!(series.len(), 30);
        }
        assert!(ind.ma5[3].is_none());
        assert!(ind.ma5[4].is_some());
        assert!(ind.ma75.iter().all(Option::is_none));
        assert!(ind.macd[0].is_some());
        assert_eq!(ind.bb_middle, ind.ma20);
    }

    #[test]
    fn test_monotonic_close_gives_non_decreasing_ma5() {
        let frame = compute(rising(30));
        let ma5: Vec<f64> = frame.indicators.unwrap().ma5.into_iter().flatten().collect();
        assert_eq!(ma5.len(), 26);
        assert!(ma5.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_strictly_increasing_rsi_is_null() {
        let frame = compute(rising(30));
        assert!(frame.indicators.unwrap().rsi.iter().all(Option::is_none));
    }

    #[test]
    fn test_volume_averages() {
        let frame = compute(rising(20));
        let ind = frame.indicators.unwrap();
        assert_eq!(ind.volume_ma5[4], Some(1000.0));
        assert_eq!(ind.volume_ma20[19], Some(1000.0));
    }
}
