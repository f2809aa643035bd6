//! Breakout Signal Engine
//!
//! Detects N-period high/low breakouts over streaming price bars, scores each
//! one 0-100 from RSI posture, relative volume, and breakout magnitude, and
//! deduplicates emissions against small per-symbol state so one breakout only
//! ever surfaces once per session.
//!
//! The engine is a pure function of `(history, prior state)`; state for each
//! symbol is independent, so scanning a universe is embarrassingly parallel.

use std::collections::HashMap;

pub mod config;
pub mod engine;

pub use config::BreakoutConfig;
pub use engine::BreakoutSignalEngine;

use crate::{BreakoutState, Symbol};

/// Keyed per-symbol breakout state, owned by the caller and threaded through
/// scans
pub type BreakoutStates = HashMap<Symbol, BreakoutState>;

/// Per-symbol sector labels attached to emitted signals
pub type SectorLabels = HashMap<Symbol, String>;
