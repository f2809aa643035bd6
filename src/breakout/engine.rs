//! Breakout detection and confidence scoring
//!
//! Entry condition: the latest price crosses the highest high (or lowest low)
//! of the prior N bars, newest bar excluded. Each confirmed breakout is
//! scored from RSI posture, relative volume, and how far past the broken
//! level the price moved, then checked against the per-symbol state so the
//! same breakout is not re-emitted across scans within a session.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rayon::prelude::*;
use tracing::debug;

use crate::data::SymbolHistories;
use crate::indicators::{self, rsi, sma};
use crate::{BreakoutState, MomentumSignal, PriceBar, PricePoint, SignalType, Symbol};

use super::{BreakoutConfig, BreakoutStates, SectorLabels};

/// Sector attached to signals for symbols the caller gave no label
const UNLABELED_SECTOR: &str = "Miscellaneous";

pub struct BreakoutSignalEngine {
    config: BreakoutConfig,
}

impl BreakoutSignalEngine {
    pub fn new(config: BreakoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BreakoutConfig {
        &self.config
    }

    /// Evaluate one symbol against its rolling history.
    ///
    /// Returns the emitted signal (if any) and the state to carry into the
    /// next scan. Histories shorter than the lookback, or a latest bar with
    /// non-finite fields, return `(None, prior)` unchanged; data-quality
    /// problems are never errors.
    pub fn scan(
        &self,
        symbol: &Symbol,
        sector: Option<&str>,
        history: &[PriceBar],
        prior: &BreakoutState,
    ) -> (Option<MomentumSignal>, BreakoutState) {
        if history.len() < self.config.lookback {
            return (None, prior.clone());
        }

        let latest = match history.last() {
            Some(bar) => bar,
            None => return (None, prior.clone()),
        };

        if !latest.is_finite() {
            debug!(symbol = %symbol, "skipping scan: non-finite fields in latest bar");
            return (None, prior.clone());
        }

        // Rolling window excludes the newest bar
        let start = history.len().saturating_sub(self.config.lookback + 1);
        let window = &history[start..history.len() - 1];

        let (window_high, window_low) =
            match (indicators::window_high(window), indicators::window_low(window)) {
                (Some(h), Some(l)) => (h, l),
                _ => return (None, prior.clone()),
            };

        let (direction, level) = if latest.price > window_high {
            (SignalType::BullishBreakout, window_high)
        } else if latest.price < window_low {
            (SignalType::BearishBreakout, window_low)
        } else {
            return (None, prior.clone());
        };

        if self.is_duplicate(prior, direction, latest) {
            return (None, prior.clone());
        }

        let key = self.signal_key(direction, latest);
        if prior.notified.contains(&key) {
            return (None, prior.clone());
        }

        let closes: Vec<f64> = history.iter().map(|b| b.price).collect();
        let rsi_series = rsi(&closes, self.config.rsi_period);
        let rsi_now = rsi_series
            .last()
            .and_then(|&x| x)
            .filter(|v| v.is_finite());
        let rsi_prev = if rsi_series.len() >= 2 {
            rsi_series[rsi_series.len() - 2].filter(|v| v.is_finite())
        } else {
            None
        };

        let volume_multiple = self.window_volume_multiple(history, latest);
        let change_15min = self.short_change(history, latest);

        let (confidence_score, reason) =
            self.score_confidence(direction, latest, level, rsi_now, rsi_prev, volume_multiple);

        let sparkline_start = history.len().saturating_sub(self.config.sparkline_len);
        let price_history: Vec<PricePoint> = history[sparkline_start..]
            .iter()
            .map(|b| PricePoint {
                timestamp: b.timestamp,
                price: b.price,
            })
            .collect();

        let signal = MomentumSignal {
            symbol: symbol.clone(),
            sector: sector.unwrap_or(UNLABELED_SECTOR).to_string(),
            signal_type: direction,
            breakout_price: latest.price,
            breakout_time: latest.timestamp,
            current_price: latest.price,
            change_15min,
            rsi: rsi_now,
            volume_multiple,
            volume_multiple_label: volume_multiple
                .map(indicators::format_volume_multiple)
                .unwrap_or_default(),
            confidence_score,
            reason,
            price_history,
        };

        debug!(
            symbol = %symbol,
            signal = ?direction,
            price = latest.price,
            confidence = confidence_score,
            "breakout signal emitted"
        );

        let state = self.advance_state(prior, direction, latest, key);
        (Some(signal), state)
    }

    /// Scan a full universe in parallel. Each symbol's `(history, state)`
    /// pair is an independent unit of work; no locking is needed. Emitted
    /// signals come back strongest-first.
    pub fn scan_universe(
        &self,
        histories: &SymbolHistories,
        sectors: &SectorLabels,
        states: &BreakoutStates,
    ) -> (Vec<MomentumSignal>, BreakoutStates) {
        let results: Vec<(Symbol, Option<MomentumSignal>, BreakoutState)> = histories
            .as_map()
            .par_iter()
            .map(|(symbol, buffer)| {
                let prior = states.get(symbol).cloned().unwrap_or_default();
                let sector = sectors.get(symbol).map(String::as_str);
                let (signal, next) = self.scan(symbol, sector, buffer.bars(), &prior);
                (symbol.clone(), signal, next)
            })
            .collect();

        let mut signals = Vec::new();
        let mut next_states = states.clone();
        for (symbol, signal, state) in results {
            signals.extend(signal);
            next_states.insert(symbol, state);
        }

        signals.sort_by(|a, b| {
            b.confidence_score
                .cmp(&a.confidence_score)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });

        (signals, next_states)
    }

    /// Same direction, same session, and no new extreme beyond the prior
    /// breakout means the prior signal still covers this move.
    fn is_duplicate(&self, prior: &BreakoutState, direction: SignalType, latest: &PriceBar) -> bool {
        let (last_dir, last_time, last_price) =
            match (prior.last_direction, prior.last_time, prior.last_price) {
                (Some(d), Some(t), Some(p)) => (d, t, p),
                _ => return false,
            };

        if last_dir != direction || !same_session(last_time, latest.timestamp) {
            return false;
        }

        match direction {
            SignalType::BullishBreakout => latest.price <= last_price,
            SignalType::BearishBreakout => latest.price >= last_price,
        }
    }

    /// Identity of a signal for approximate-duplicate suppression: direction,
    /// session day, and the breakout price bucketed to a coarse precision.
    fn signal_key(&self, direction: SignalType, latest: &PriceBar) -> String {
        format!(
            "{:?}:{}:{:.prec$}",
            direction,
            latest.timestamp.date_naive(),
            latest.price,
            prec = self.config.dedup_price_decimals,
        )
    }

    fn advance_state(
        &self,
        prior: &BreakoutState,
        direction: SignalType,
        latest: &PriceBar,
        key: String,
    ) -> BreakoutState {
        let mut state = prior.clone();
        // Keys from earlier sessions can never match again; drop them
        let new_session = state
            .last_time
            .map_or(true, |t| !same_session(t, latest.timestamp));
        if new_session {
            state.notified.clear();
        }
        state.last_direction = Some(direction);
        state.last_time = Some(latest.timestamp);
        state.last_price = Some(latest.price);
        state.notified.insert(key);
        state
    }

    /// Relative volume of the latest bar against the mean of the same window
    /// the breakout test used
    fn window_volume_multiple(&self, history: &[PriceBar], latest: &PriceBar) -> Option<f64> {
        let volumes: Vec<f64> = history[..history.len() - 1].iter().map(|b| b.volume).collect();
        let period = self.config.lookback.min(volumes.len());
        if period == 0 {
            return None;
        }
        let average = sma(&volumes, period).last().and_then(|&x| x)?;
        indicators::volume_multiple(latest.volume, average)
    }

    /// Percent change against the nearest prior sample ~`change_window`
    /// minutes back
    fn short_change(&self, history: &[PriceBar], latest: &PriceBar) -> f64 {
        let target = latest.timestamp - Duration::minutes(self.config.change_window_minutes);
        match indicators::nearest_sample_at(&history[..history.len() - 1], target) {
            Some(past) if past.price > 0.0 => indicators::percent_change(past.price, latest.price),
            _ => 0.0,
        }
    }

    /// Composite 0-100 confidence plus the dominant factors behind it.
    /// Deterministic: identical inputs always produce the identical score.
    fn score_confidence(
        &self,
        direction: SignalType,
        latest: &PriceBar,
        level: f64,
        rsi_now: Option<f64>,
        rsi_prev: Option<f64>,
        volume_multiple: Option<f64>,
    ) -> (u8, Vec<String>) {
        let cfg = &self.config;
        let bullish = direction.is_bullish();
        let mut score = cfg.base_score;
        let mut factors: Vec<(f64, String)> = Vec::new();

        // RSI extremity reinforces an aligned breakout and dampens an
        // opposed one; undefined RSI contributes nothing.
        if let Some(rsi_now) = rsi_now {
            if rsi_now > 70.0 {
                let delta = if bullish {
                    cfg.rsi_extreme_weight
                } else {
                    -cfg.rsi_extreme_weight
                };
                score += delta;
                factors.push((delta, "RSI overbought".to_string()));
            } else if rsi_now < 30.0 {
                let delta = if bullish {
                    -cfg.rsi_extreme_weight
                } else {
                    cfg.rsi_extreme_weight
                };
                score += delta;
                factors.push((delta, "RSI oversold".to_string()));
            }

            if let Some(rsi_prev) = rsi_prev {
                let rising = rsi_now > rsi_prev;
                let falling = rsi_now < rsi_prev;
                if (bullish && falling) || (!bullish && rising) {
                    score -= cfg.rsi_slope_penalty;
                    factors.push((-cfg.rsi_slope_penalty, "Momentum fading".to_string()));
                } else if (bullish && rising) || (!bullish && falling) {
                    score += cfg.rsi_slope_bonus;
                    factors.push((cfg.rsi_slope_bonus, "Momentum building".to_string()));
                }
            }
        }

        if let Some(mult) = volume_multiple {
            if mult > cfg.volume_spike_threshold {
                let mut delta = cfg.volume_spike_weight;
                if mult > cfg.volume_surge_threshold {
                    delta += cfg.volume_surge_weight;
                }
                score += delta;
                factors.push((
                    delta,
                    format!("High volume ({})", indicators::format_volume_multiple(mult)),
                ));
            } else if mult < cfg.low_volume_threshold {
                score -= cfg.low_volume_penalty;
                factors.push((
                    -cfg.low_volume_penalty,
                    format!("Thin volume ({})", indicators::format_volume_multiple(mult)),
                ));
            }
        }

        if level > 0.0 {
            let magnitude_pct = ((latest.price - level) / level * 100.0).abs();
            let delta = (magnitude_pct * cfg.magnitude_weight).min(cfg.magnitude_cap);
            if delta > 0.0 {
                let label = if bullish {
                    format!("Cleared resistance by {:.1}%", magnitude_pct)
                } else {
                    format!("Broke support by {:.1}%", magnitude_pct)
                };
                score += delta;
                factors.push((delta, label));
            }
        }

        factors.sort_by(|a, b| {
            b.0.abs()
                .partial_cmp(&a.0.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let headline = if bullish {
            format!("New {}-bar high", cfg.lookback)
        } else {
            format!("New {}-bar low", cfg.lookback)
        };
        let mut reason = vec![headline];
        reason.extend(factors.into_iter().map(|(_, label)| label));
        reason.truncate(cfg.max_reasons);

        let confidence = score.clamp(0.0, 100.0).round() as u8;
        (confidence, reason)
    }
}

fn same_session(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    session_day(a) == session_day(b)
}

fn session_day(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}
