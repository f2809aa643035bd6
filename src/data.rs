//! Rolling history buffers and batch data loading
//!
//! The engines only ever see in-memory slices; this module owns the bounded
//! per-symbol buffers the caller appends poll ticks into, plus CSV loaders
//! for driving batch scans from recorded data.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::{PriceBar, StockFundamentalSnapshot, Symbol};

/// Default per-symbol capacity: a 6-second poll cadence needs ~150 bars to
/// look 15 minutes back, plus headroom for the breakout window and RSI warmup
pub const DEFAULT_MAX_BARS: usize = 256;

// =============================================================================
// Rolling history
// =============================================================================

/// Bounded, time-ordered bar store for one symbol. Old bars are evicted from
/// the front once capacity is reached; a tick carrying the same timestamp as
/// the tail replaces it.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    bars: Vec<PriceBar>,
    max_bars: usize,
}

impl HistoryBuffer {
    pub fn new(max_bars: usize) -> Self {
        Self {
            bars: Vec::new(),
            max_bars,
        }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Append a bar, keeping timestamps strictly increasing. A same-timestamp
    /// tick updates the tail bar in place; a stale tick is dropped.
    pub fn append(&mut self, bar: PriceBar) {
        if let Some(last) = self.bars.last_mut() {
            if bar.timestamp == last.timestamp {
                *last = bar;
                return;
            }
            if bar.timestamp < last.timestamp {
                warn!(
                    incoming = %bar.timestamp,
                    tail = %last.timestamp,
                    "dropping out-of-order bar"
                );
                return;
            }
        }
        self.bars.push(bar);
        if self.bars.len() > self.max_bars {
            self.bars.remove(0);
        }
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BARS)
    }
}

/// Per-symbol rolling histories, keyed the way scans consume them
#[derive(Debug, Clone, Default)]
pub struct SymbolHistories {
    data: HashMap<Symbol, HistoryBuffer>,
    max_bars: usize,
}

impl SymbolHistories {
    pub fn new(max_bars: usize) -> Self {
        Self {
            data: HashMap::new(),
            max_bars,
        }
    }

    pub fn append(&mut self, symbol: &Symbol, bar: PriceBar) {
        let max_bars = if self.max_bars > 0 {
            self.max_bars
        } else {
            DEFAULT_MAX_BARS
        };
        self.data
            .entry(symbol.clone())
            .or_insert_with(|| HistoryBuffer::new(max_bars))
            .append(bar);
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&HistoryBuffer> {
        self.data.get(symbol)
    }

    /// Drop a symbol no longer being tracked
    pub fn remove(&mut self, symbol: &Symbol) -> Option<HistoryBuffer> {
        self.data.remove(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.data.keys()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_map(&self) -> &HashMap<Symbol, HistoryBuffer> {
        &self.data
    }
}

// =============================================================================
// Data validation
// =============================================================================

/// Result of bar-series validation
#[derive(Debug)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a bar series for consistency
pub fn validate_bars(bars: &[PriceBar]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if bars.is_empty() {
        errors.push("No bars provided".to_string());
        return ValidationResult { errors, warnings };
    }

    for (i, bar) in bars.iter().enumerate() {
        if let Err(e) = bar.validate() {
            errors.push(format!("Bar {}: {}", i, e));
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            warnings.push(format!("Bar {}: not chronological", i));
        }
    }

    ValidationResult { errors, warnings }
}

// =============================================================================
// CSV loading
// =============================================================================

/// Load price bars from a CSV file with validation.
///
/// Expected columns: `timestamp,price,open,high,low,volume` where timestamp
/// is epoch milliseconds or `YYYY-MM-DD HH:MM:SS`. Invalid rows are skipped
/// with a warning, never fatal.
pub fn load_bars_csv(path: impl AsRef<Path>) -> Result<Vec<PriceBar>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).context("Failed to open CSV file")?;

    let mut bars = Vec::new();
    let mut invalid_count = 0;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to read row {}", row_idx + 1))?;

        let ts_str = record.get(0).context("Missing timestamp column")?;
        let timestamp = parse_timestamp(ts_str)
            .context(format!("Failed to parse timestamp: {}", ts_str))?;

        let price: f64 = record
            .get(1)
            .context("Missing price column")?
            .parse()
            .context("Failed to parse price")?;
        let open: f64 = record
            .get(2)
            .context("Missing open column")?
            .parse()
            .context("Failed to parse open")?;
        let high: f64 = record
            .get(3)
            .context("Missing high column")?
            .parse()
            .context("Failed to parse high")?;
        let low: f64 = record
            .get(4)
            .context("Missing low column")?
            .parse()
            .context("Failed to parse low")?;
        let volume: f64 = record
            .get(5)
            .context("Missing volume column")?
            .parse()
            .context("Failed to parse volume")?;

        match PriceBar::new(timestamp, price, open, high, low, volume) {
            Ok(bar) => bars.push(bar),
            Err(e) => {
                invalid_count += 1;
                warn!(
                    "Skipping invalid bar at row {} in {:?}: {}",
                    row_idx + 2,
                    path.file_name().unwrap_or_default(),
                    e
                );
            }
        }
    }

    if invalid_count > 0 {
        warn!(
            "Skipped {} invalid bars out of {} in {:?}",
            invalid_count,
            invalid_count + bars.len(),
            path.file_name().unwrap_or_default()
        );
    }

    Ok(bars)
}

/// Load fundamental snapshots from a CSV file with a header row matching the
/// snake_case field names of [`StockFundamentalSnapshot`]
pub fn load_snapshots_csv(path: impl AsRef<Path>) -> Result<Vec<StockFundamentalSnapshot>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).context("Failed to open CSV file")?;

    let mut snapshots = Vec::new();
    let mut invalid_count = 0;

    for (row_idx, result) in reader.deserialize::<StockFundamentalSnapshot>().enumerate() {
        match result {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                invalid_count += 1;
                warn!(
                    "Skipping invalid snapshot at row {} in {:?}: {}",
                    row_idx + 2,
                    path.file_name().unwrap_or_default(),
                    e
                );
            }
        }
    }

    if invalid_count > 0 {
        warn!(
            "Skipped {} invalid snapshots out of {} in {:?}",
            invalid_count,
            invalid_count + snapshots.len(),
            path.file_name().unwrap_or_default()
        );
    }

    Ok(snapshots)
}

/// Parse a timestamp field: epoch milliseconds, or a datetime string assumed
/// to be UTC
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    use chrono::TimeZone;

    if let Ok(ms) = s.parse::<i64>() {
        return Utc
            .timestamp_millis_opt(ms)
            .single()
            .context(format!("Epoch value out of range: {}", ms));
    }

    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Ok(dt);
    }

    let ndt = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .context(format!("Unrecognized timestamp format: {}", s))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(ts_ms: i64, price: f64) -> PriceBar {
        PriceBar::new_unchecked(
            Utc.timestamp_millis_opt(ts_ms).unwrap(),
            price,
            price,
            price + 1.0,
            price - 1.0,
            1_000.0,
        )
    }

    #[test]
    fn test_history_buffer_evicts_oldest() {
        let mut buffer = HistoryBuffer::new(3);
        for i in 0..5 {
            buffer.append(bar(i * 1_000, 100.0 + i as f64));
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.bars()[0].price, 102.0);
        assert_eq!(buffer.latest().unwrap().price, 104.0);
    }

    #[test]
    fn test_history_buffer_replaces_same_timestamp() {
        let mut buffer = HistoryBuffer::new(10);
        buffer.append(bar(1_000, 100.0));
        buffer.append(bar(1_000, 101.0));

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.latest().unwrap().price, 101.0);
    }

    #[test]
    fn test_history_buffer_drops_stale_ticks() {
        let mut buffer = HistoryBuffer::new(10);
        buffer.append(bar(2_000, 100.0));
        buffer.append(bar(1_000, 99.0));

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.latest().unwrap().price, 100.0);
    }

    #[test]
    fn test_symbol_histories_keyed_independently() {
        let mut histories = SymbolHistories::new(10);
        let a = Symbol::new("A");
        let b = Symbol::new("B");

        histories.append(&a, bar(1_000, 100.0));
        histories.append(&b, bar(1_000, 200.0));
        histories.append(&a, bar(2_000, 101.0));

        assert_eq!(histories.len(), 2);
        assert_eq!(histories.get(&a).unwrap().len(), 2);
        assert_eq!(histories.get(&b).unwrap().len(), 1);

        histories.remove(&b);
        assert!(histories.get(&b).is_none());
    }

    #[test]
    fn test_validate_bars_flags_bad_rows() {
        let good = bar(1_000, 100.0);
        let mut bad = bar(2_000, 100.0);
        bad.high = 90.0;

        let result = validate_bars(&[good.clone(), bad]);
        assert!(!result.is_valid());

        let result = validate_bars(&[good]);
        assert!(result.is_valid());
    }

    #[test]
    fn test_validate_bars_warns_on_non_chronological() {
        let result = validate_bars(&[bar(2_000, 100.0), bar(1_000, 101.0)]);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("1700000000000").is_ok());
        assert!(parse_timestamp("2023-11-14 22:13:20").is_ok());
        assert!(parse_timestamp("not-a-time").is_err());
    }
}
