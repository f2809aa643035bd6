//! Technical indicators powered by the `ta` crate
//!
//! Wrappers around the `ta` crate plus the window scans the breakout engine
//! needs. Wrapped indicators follow the warm-up convention of returning
//! `None` until `period` samples have been consumed, so a caller can zip the
//! output against its input series without index bookkeeping.

use chrono::{DateTime, Utc};
use ta::indicators::{RelativeStrengthIndex, SimpleMovingAverage};
use ta::Next;

use crate::PriceBar;

/// Calculate RSI (Relative Strength Index) using ta crate
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut indicator = match RelativeStrengthIndex::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    let mut result = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let rsi_val = indicator.next(value);
        if i + 1 >= period {
            result.push(Some(rsi_val));
        } else {
            result.push(None);
        }
    }

    result
}

/// Calculate Simple Moving Average
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut indicator = match SimpleMovingAverage::new(period) {
        Ok(i) => i,
        Err(_) => return vec![None; values.len()],
    };

    let mut result = Vec::with_capacity(values.len());

    for (i, &value) in values.iter().enumerate() {
        let sma_val = indicator.next(value);
        if i + 1 >= period {
            result.push(Some(sma_val));
        } else {
            result.push(None);
        }
    }

    result
}

/// Highest high across a window of bars
pub fn window_high(bars: &[PriceBar]) -> Option<f64> {
    bars.iter()
        .map(|b| b.high)
        .fold(None, |max, h| Some(max.map_or(h, |m: f64| m.max(h))))
}

/// Lowest low across a window of bars
pub fn window_low(bars: &[PriceBar]) -> Option<f64> {
    bars.iter()
        .map(|b| b.low)
        .fold(None, |min, l| Some(min.map_or(l, |m: f64| m.min(l))))
}

/// Relative volume multiple; None when the average is unusable.
/// Values below 1.0 are valid and mean below-average participation.
pub fn volume_multiple(current: f64, average: f64) -> Option<f64> {
    if average > 0.0 && average.is_finite() && current.is_finite() {
        Some(current / average)
    } else {
        None
    }
}

/// Display form of a volume multiple, e.g. "2.3×"
pub fn format_volume_multiple(multiple: f64) -> String {
    format!("{:.1}×", multiple)
}

/// Percent change from `from` to `to`
pub fn percent_change(from: f64, to: f64) -> f64 {
    if from != 0.0 {
        (to - from) / from * 100.0
    } else {
        0.0
    }
}

/// Bar closest to `target` by absolute timestamp distance. No interpolation;
/// on a coarse feed this simply picks the nearest recorded sample.
pub fn nearest_sample_at(bars: &[PriceBar], target: DateTime<Utc>) -> Option<&PriceBar> {
    bars.iter()
        .min_by_key(|b| (b.timestamp - target).num_milliseconds().abs())
}
