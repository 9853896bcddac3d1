/// Simple Moving Average (SMA)
/// Returns a vector aligned with `values`:
/// - `None` until enough values exist
/// - `Some(avg)` after `window` values
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    // Running sum; subtract the value that falls out of the window.
    values
        .iter()
        .enumerate()
        .scan(0.0_f64, move |sum, (i, &v)| {
            *sum += v;
            if i >= window {
                *sum -= values[i - window];
            }

            let out = if i + 1 >= window {
                Some(*sum / window as f64)
            } else {
                None
            };

            Some(out)
        })
        .collect()
}

/// Exponential Moving Average (EMA), recursive form.
///
/// Seeded with the first value and defined from index 0:
/// `ema[0] = x[0]`, `ema[i] = α·x[i] + (1-α)·ema[i-1]` with `α = 2 / (span + 1)`.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let alpha = 2.0 / (span.max(1) as f64 + 1.0);

    values
        .iter()
        .scan(first, move |prev, &v| {
            let next = alpha * v + (1.0 - alpha) * *prev;
            *prev = next;
            Some(next)
        })
        .collect()
}

/// Rolling sample standard deviation (n - 1 denominator).
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let variance = slice
                .iter()
                .map(|&x| {
                    let diff = x - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (window - 1) as f64;
            Some(variance.sqrt())
        })
        .collect()
}

/// Relative Strength Index (RSI)
///
/// Measures momentum by comparing recent gains to recent losses, on a 0-100
/// scale (below 30 oversold, above 70 overbought).
///
/// Calculation:
/// 1. Close-to-close changes, split into gains and losses
/// 2. Simple rolling mean of each over `period` changes
/// 3. RS = Average Gain / Average Loss
/// 4. RSI = 100 - (100 / (1 + RS))
///
/// Gains and losses are aligned with the prices, with a zero move at index
/// 0, so the first value appears at index `period - 1` like every other
/// rolling window. When the average loss is zero RS is undefined and the
/// point is `None`.
pub fn rsi(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; prices.len()];
    if period == 0 || prices.len() < period {
        return result;
    }

    let moves: Vec<f64> = std::iter::once(0.0)
        .chain(prices.windows(2).map(|w| w[1] - w[0]))
        .collect();
    let gains: Vec<f64> = moves.iter().map(|m| m.max(0.0)).collect();
    let losses: Vec<f64> = moves.iter().map(|m| (-m).max(0.0)).collect();

    let avg_gains = sma(&gains, period);
    let avg_losses = sma(&losses, period);

    for (i, (gain, loss)) in avg_gains.iter().zip(&avg_losses).enumerate() {
        if let (Some(gain), Some(loss)) = (gain, loss) {
            if *loss > 0.0 {
                let rs = gain / loss;
                result[i] = Some(100.0 - (100.0 / (1.0 + rs)));
            }
        }
    }

    result
}

/// MACD line, signal line and histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Moving Average Convergence Divergence (MACD)
///
/// - MACD Line: fast EMA - slow EMA
/// - Signal Line: EMA of the MACD line
/// - Histogram: MACD Line - Signal Line
///
/// All three are defined from the first observation.
pub fn macd(prices: &[f64], fast_span: usize, slow_span: usize, signal_span: usize) -> Macd {
    let fast = ema(prices, fast_span);
    let slow = ema(prices, slow_span);

    let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema(&macd, signal_span);
    let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

    Macd { macd, signal, histogram }
}

/// Bollinger Bands
///
/// - Middle Band: SMA of prices
/// - Upper Band: Middle Band + (std_dev * num_std_dev)
/// - Lower Band: Middle Band - (std_dev * num_std_dev)
///
/// Standard configuration: 20-period SMA, 2 sample standard deviations.
///
/// Returns: (middle_band, upper_band, lower_band)
pub fn bollinger_bands(
    prices: &[f64],
    period: usize,
    num_std_dev: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let middle_band = sma(prices, period);
    let std_dev = rolling_std(prices, period);

    let (upper_band, lower_band) = middle_band
        .iter()
        .zip(&std_dev)
        .map(|(mid, sd)| match (mid, sd) {
            (Some(m), Some(s)) => (Some(m + num_std_dev * s), Some(m - num_std_dev * s)),
            _ => (None, None),
        })
        .unzip();

    (middle_band, upper_band, lower_band)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_sma_warmup_and_values() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_ema_seeded_with_first_value() {
        let out = ema(&[10.0, 20.0, 30.0], 3);
        // alpha = 0.5
        assert!(approx(out[0], 10.0));
        assert!(approx(out[1], 15.0));
        assert!(approx(out[2], 22.5));
        assert!(ema(&[], 3).is_empty());
    }

    #[test]
    fn test_rsi_basic() {
        // Alternating gains and losses
        let prices = vec![44.0, 44.5, 44.0, 45.0, 44.5, 45.5, 45.0, 46.0, 46.5, 46.0,
                         47.0, 46.5, 47.5, 47.0, 48.0, 48.5];
        let rsi_values = rsi(&prices, 14);

        for value in &rsi_values[..13] {
            assert!(value.is_none());
        }

        // Window ending at prices[13]: the zero move plus 13 changes,
        // gains 6.0 total, losses 3.0 total
        assert!(approx(rsi_values[13].unwrap(), 100.0 - 100.0 / (1.0 + 6.0 / 3.0)));
        // Window ending at prices[14]: gains 7.0, losses 3.0
        assert!(approx(rsi_values[14].unwrap(), 100.0 - 100.0 / (1.0 + 7.0 / 3.0)));
        for value in rsi_values[13..].iter().flatten() {
            assert!((0.0..=100.0).contains(value));
        }
    }

    #[test]
    fn test_rsi_first_value_at_window_end() {
        let prices: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect();
        let rsi_values = rsi(&prices, 14);

        assert_eq!(rsi_values.len(), prices.len());
        assert_eq!(rsi_values.iter().position(Option::is_some), Some(13));
        assert!(rsi(&prices[..13], 14).iter().all(Option::is_none));
    }

    #[test]
    fn test_rsi_downtrend_is_oversold() {
        let downtrend: Vec<f64> = (0..30).map(|i| 80.0 - i as f64).collect();
        let rsi_values = rsi(&downtrend, 14);

        let last = rsi_values.last().copied().flatten().unwrap();
        assert!(last < 30.0, "Strong downtrend should show oversold RSI");
    }

    #[test]
    fn test_rsi_without_losses_is_undefined() {
        let uptrend: Vec<f64> = (0..30).map(|i| 50.0 + i as f64).collect();
        assert!(rsi(&uptrend, 14).iter().all(Option::is_none));
    }

    #[test]
    fn test_macd_basic() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.5)).collect();
        let result = macd(&prices, 12, 26, 9);

        assert_eq!(result.macd.len(), prices.len());
        assert_eq!(result.signal.len(), prices.len());
        assert_eq!(result.histogram.len(), prices.len());
        assert!(approx(result.macd[0], 0.0));

        // In an uptrend the fast EMA leads
        assert!(*result.macd.last().unwrap() > 0.0, "Uptrend should have positive MACD");
    }

    #[test]
    fn test_bollinger_bands_flat_prices_collapse() {
        let prices = vec![100.0; 30];
        let (middle, upper, lower) = bollinger_bands(&prices, 20, 2.0);

        assert_eq!(middle.len(), prices.len());
        assert!(upper[18].is_none());
        assert_eq!(middle[25], Some(100.0));
        assert_eq!(upper[25], Some(100.0));
        assert_eq!(lower[25], Some(100.0));
    }

    #[test]
    fn test_bollinger_uses_sample_deviation() {
        let prices = [1.0, 2.0, 3.0, 4.0];
        let (middle, upper, _) = bollinger_bands(&prices, 4, 2.0);
        // sample variance of 1..4 is 5/3
        let expected = 2.5 + 2.0 * (5.0_f64 / 3.0).sqrt();
        assert_eq!(middle[3], Some(2.5));
        assert!(approx(upper[3].unwrap(), expected));
    }

    #[test]
    fn test_bollinger_bands_volatility() {
        let volatile: Vec<f64> = (0..30).map(|i| 100.0 + ((i as f64 * 2.0).sin() * 10.0)).collect();
        let (_, upper_vol, lower_vol) = bollinger_bands(&volatile, 20, 2.0);

        let stable: Vec<f64> = vec![100.0; 30];
        let (_, upper_stable, lower_stable) = bollinger_bands(&stable, 20, 2.0);

        let vol_width = upper_vol[25].unwrap() - lower_vol[25].unwrap();
        let stable_width = upper_stable[25].unwrap() - lower_stable[25].unwrap();
        assert!(vol_width > stable_width, "Volatile data should have wider Bollinger Bands");
    }
}
