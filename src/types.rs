//! Core data types shared by the breakout and sector analysis engines

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for price bar data
#[derive(Debug, Error)]
pub enum BarValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("price ({price}) must be between low ({low}) and high ({high})")]
    PriceOutOfRange { price: f64, low: f64, high: f64 },

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(f64),

    #[error("prices must be positive and finite: price={price}, open={open}, high={high}, low={low}")]
    InvalidPrice {
        price: f64,
        open: f64,
        high: f64,
        low: f64,
    },

    #[error("timestamp ({0}) is not a representable epoch-milliseconds value")]
    InvalidTimestamp(i64),
}

/// One observed price sample for a symbol at a point in time.
///
/// `price` is the latest trade price, `open_price` the session open, and
/// `high`/`low` the intrasession extremes seen so far. The symbol itself is
/// carried by the keyed store, not by every bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub open_price: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Create a new bar with validation
    pub fn new(
        timestamp: DateTime<Utc>,
        price: f64,
        open_price: f64,
        high: f64,
        low: f64,
        volume: f64,
    ) -> Result<Self, BarValidationError> {
        let bar = Self {
            timestamp,
            price,
            open_price,
            high,
            low,
            volume,
        };
        bar.validate()?;
        Ok(bar)
    }

    /// Create a bar from an epoch-milliseconds timestamp, the wire format of
    /// the upstream quote feeds
    pub fn from_epoch_ms(
        timestamp_ms: i64,
        price: f64,
        open_price: f64,
        high: f64,
        low: f64,
        volume: f64,
    ) -> Result<Self, BarValidationError> {
        let timestamp = Utc
            .timestamp_millis_opt(timestamp_ms)
            .single()
            .ok_or(BarValidationError::InvalidTimestamp(timestamp_ms))?;
        Self::new(timestamp, price, open_price, high, low, volume)
    }

    /// Create a bar without validation (for trusted sources or when
    /// validation is done separately)
    pub fn new_unchecked(
        timestamp: DateTime<Utc>,
        price: f64,
        open_price: f64,
        high: f64,
        low: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            price,
            open_price,
            high,
            low,
            volume,
        }
    }

    /// Validate the bar data
    pub fn validate(&self) -> Result<(), BarValidationError> {
        let finite = self.price.is_finite()
            && self.open_price.is_finite()
            && self.high.is_finite()
            && self.low.is_finite();
        if !finite || self.price <= 0.0 || self.open_price <= 0.0 || self.low <= 0.0 {
            return Err(BarValidationError::InvalidPrice {
                price: self.price,
                open: self.open_price,
                high: self.high,
                low: self.low,
            });
        }

        if self.high < self.low {
            return Err(BarValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.volume < 0.0 || !self.volume.is_finite() {
            return Err(BarValidationError::NegativeVolume(self.volume));
        }

        if self.price < self.low || self.price > self.high {
            return Err(BarValidationError::PriceOutOfRange {
                price: self.price,
                low: self.low,
                high: self.high,
            });
        }

        if self.open_price < self.low || self.open_price > self.high {
            return Err(BarValidationError::OpenOutOfRange {
                open: self.open_price,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    /// Check if the bar is valid without returning detailed error
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// All numeric fields present and finite; the minimum bar quality a scan
    /// will accept
    pub fn is_finite(&self) -> bool {
        self.price.is_finite()
            && self.open_price.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.volume.is_finite()
    }
}

/// Exchange-qualified ticker symbol (e.g. "NASDAQ:AAPL", "NSE:RELIANCE")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Symbol(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Market universe selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Market {
    #[default]
    Us,
    In,
}

impl std::str::FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "us" => Ok(Market::Us),
            "in" => Ok(Market::In),
            _ => Err(format!("Unknown market: {}. Use 'US' or 'IN'", s)),
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Market::Us => write!(f, "US"),
            Market::In => write!(f, "IN"),
        }
    }
}

/// Breakout signal classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalType {
    BullishBreakout,
    BearishBreakout,
}

impl SignalType {
    pub fn is_bullish(&self) -> bool {
        matches!(self, SignalType::BullishBreakout)
    }
}

/// Intraday direction relative to the session open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Bullish,
    Bearish,
}

/// Sentiment bucket derived from advance/decline ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

/// Institutional/insider buying pressure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrongMoneySignal {
    Buying,
    Selling,
    Neutral,
}

/// Per-symbol carry-over state for breakout deduplication.
///
/// Created on first sight of a symbol, mutated only by the engine on scans
/// that confirm a new breakout. The caller holds these in a keyed store and
/// may drop entries for symbols it no longer tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakoutState {
    pub last_direction: Option<SignalType>,
    pub last_time: Option<DateTime<Utc>>,
    pub last_price: Option<f64>,
    /// Identities of signals already emitted this session
    pub notified: HashSet<String>,
}

/// Timestamped price sample kept on emitted signals for sparkline rendering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// A confirmed breakout, scored and annotated. Immutable once emitted; the
/// caller decides whether to store or notify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumSignal {
    pub symbol: Symbol,
    pub sector: String,
    pub signal_type: SignalType,
    pub breakout_price: f64,
    pub breakout_time: DateTime<Utc>,
    pub current_price: f64,
    /// Percent change against the nearest sample ~15 minutes back
    pub change_15min: f64,
    /// None until enough history has accumulated for the RSI period
    pub rsi: Option<f64>,
    pub volume_multiple: Option<f64>,
    /// Display form of the volume multiple, e.g. "2.3×"
    pub volume_multiple_label: String,
    /// Composite confidence, clamped to 0..=100
    pub confidence_score: u8,
    /// Dominant contributing factors, strongest first
    pub reason: Vec<String>,
    pub price_history: Vec<PricePoint>,
}

/// Per-symbol fundamentals snapshot consumed by the sector aggregator.
///
/// Holding percentages are fractions (0.02 = 2% net insider buying).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockFundamentalSnapshot {
    pub symbol: Symbol,
    pub name: String,
    pub sector: String,
    pub exchange: String,
    pub currency: String,
    pub current_price: f64,
    pub open_price: f64,
    pub change_percent: f64,
    pub fifty_two_week_high: f64,
    pub fifty_two_week_low: f64,
    pub insider_net_percent: f64,
    pub institutional_held_percent: f64,
    pub volume: f64,
    pub average_volume: f64,
    pub market_cap: f64,
}

/// Derived per-stock analysis. The snapshot is kept as received; `sector`
/// holds the canonical sector name used for grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAnalysis {
    pub snapshot: StockFundamentalSnapshot,
    pub sector: String,
    /// Position within the 52-week range, 0..=100
    pub r_factor: f64,
    pub intraday_trend: TrendDirection,
    pub strong_money_signal: StrongMoneySignal,
    pub strong_money_score: i32,
    /// Contributing factors in rule evaluation order
    pub reasons: Vec<String>,
}

/// Per-sector rollup row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorHeatmapRow {
    pub sector: String,
    pub stock_count: usize,
    pub avg_r_factor: f64,
    /// Aggregate strong-money pressure, -100..=100
    pub strong_money_intensity: f64,
    pub buying_stocks: usize,
    pub selling_stocks: usize,
    pub advancing_stocks: usize,
    pub declining_stocks: usize,
    /// Advance/decline ratio; 999 when nothing declined, 1 when nothing moved
    pub ad_ratio: f64,
    pub weighted_change_percent: f64,
    pub total_market_cap: f64,
    pub sentiment: Sentiment,
}

/// Whole-universe rollup computed the same way as a sector row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSummary {
    pub advancing_stocks: usize,
    pub declining_stocks: usize,
    pub ad_ratio: f64,
    pub sentiment: Sentiment,
    pub weighted_change_percent: f64,
    pub total_market_cap: f64,
}

/// Full output of one aggregation pass.
///
/// `total_stocks_analyzed` counts the whole input batch;
/// `total_stocks_with_data` counts the rows that survived data-quality
/// filtering. Callers use the difference to distinguish "quiet market" from
/// "no data".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorAnalysis {
    pub market: Market,
    pub stocks: Vec<StockAnalysis>,
    pub sectors: Vec<SectorHeatmapRow>,
    pub market_summary: MarketSummary,
    pub total_stocks_analyzed: usize,
    pub total_stocks_with_data: usize,
}
