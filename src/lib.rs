//! Momentum Radar Core
//!
//! Streaming momentum/breakout detection and sector sentiment analysis for
//! market dashboards.
//!
//! Two engines, both pure functions of their inputs plus a small amount of
//! explicit per-symbol state:
//!
//! - [`breakout::BreakoutSignalEngine`]: 20-period high/low breakouts over a
//!   rolling bar window, with RSI(14), relative volume, and a deterministic
//!   0-100 confidence score. Emission is deduplicated per symbol per session
//!   through caller-held [`BreakoutState`].
//! - [`sector::SectorAggregator`]: per-stock R-Factor / intraday trend /
//!   strong-money scoring over fundamental snapshot batches, rolled up into
//!   ranked sector heatmap rows with advance/decline ratios and
//!   market-cap-weighted change.
//!
//! Transport, persistence, scheduling, and notification delivery live with
//! the caller; the engines never block and never perform I/O. Scans across
//! symbols are independent, so universes can be evaluated in parallel.
//!
//! # Breakout scan
//! ```
//! use momentum_radar::breakout::{BreakoutConfig, BreakoutSignalEngine};
//! use momentum_radar::{BreakoutState, PriceBar, SignalType, Symbol};
//!
//! let engine = BreakoutSignalEngine::new(BreakoutConfig::default());
//! let symbol = Symbol::new("NASDAQ:AAPL");
//!
//! // 25 ascending bars at a 6-second cadence; the last one clears the
//! // prior 20-bar high
//! let bars: Vec<PriceBar> = (0..25)
//!     .map(|i| {
//!         let price = 100.0 + i as f64;
//!         PriceBar::from_epoch_ms(
//!             1_700_000_000_000 + i as i64 * 6_000,
//!             price,
//!             100.0,
//!             price + 0.5,
//!             99.5,
//!             10_000.0,
//!         )
//!         .unwrap()
//!     })
//!     .collect();
//!
//! let (signal, state) = engine.scan(
//!     &symbol,
//!     Some("Information Technology"),
//!     &bars,
//!     &BreakoutState::default(),
//! );
//!
//! let signal = signal.expect("breakout expected");
//! assert_eq!(signal.signal_type, SignalType::BullishBreakout);
//! assert_eq!(state.last_direction, Some(SignalType::BullishBreakout));
//! ```

pub mod alerts;
pub mod breakout;
pub mod config;
pub mod data;
pub mod indicators;
pub mod sector;
pub mod types;

pub use breakout::{BreakoutSignalEngine, BreakoutStates};
pub use config::Config;
pub use data::{HistoryBuffer, SymbolHistories};
pub use sector::{normalize_sector, SectorAggregator};
pub use types::*;
