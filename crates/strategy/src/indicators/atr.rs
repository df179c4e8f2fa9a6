//! True Range and Average True Range.
//!
//! ATR here is the simple trailing mean of TR with a minimum of one sample:
//! before `period` bars exist the window is truncated to the bars available,
//! so every bar has a defined value (no zero padding, no NaN warmup).

use common::Candle;

/// Per-bar True Range. The first bar has no prior close and uses `high - low`.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let high_low = c.high - c.low;
            match i.checked_sub(1).map(|p| candles[p].close) {
                Some(prev_close) => high_low
                    .max((c.high - prev_close).abs())
                    .max((c.low - prev_close).abs()),
                None => high_low,
            }
        })
        .collect()
}

/// Trailing simple mean of `true_range` over `period` bars, truncated at the start.
///
/// `period` must be at least 1; `SupertrendParams` enforces this before any
/// computation runs.
pub fn atr(candles: &[Candle], period: usize) -> Vec<f64> {
    rolling_mean(&true_range(candles), period)
}

fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    (0..values.len())
        .map(|i| {
            let window = &values[(i + 1).saturating_sub(period)..=i];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}
