//! Breakout engine configuration
//!
//! The scoring weights are a tunable policy, not a fixed contract; the
//! defaults below are what the dashboard ships with.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakoutConfig {
    /// Lookback period for the rolling high/low window (default: 20)
    pub lookback: usize,

    /// RSI period (default: 14)
    pub rsi_period: usize,

    /// Horizon of the short-term change readout, in minutes (default: 15)
    pub change_window_minutes: i64,

    /// Volume multiple treated as institutional participation (default: 1.5)
    pub volume_spike_threshold: f64,

    /// Volume multiple above which participation is exceptional (default: 3.0)
    pub volume_surge_threshold: f64,

    /// Volume multiple below which participation is thin (default: 0.8)
    pub low_volume_threshold: f64,

    /// Trailing samples kept on emitted signals for sparklines (default: 20)
    pub sparkline_len: usize,

    /// Confidence starting point (default: 50)
    pub base_score: f64,

    /// Bonus/penalty for RSI beyond the 70/30 bands (default: 15)
    pub rsi_extreme_weight: f64,

    /// Penalty when the RSI slope opposes the breakout direction (default: 10)
    pub rsi_slope_penalty: f64,

    /// Bonus when the RSI slope confirms the breakout direction (default: 5)
    pub rsi_slope_bonus: f64,

    /// Bonus for volume above the spike threshold (default: 15)
    pub volume_spike_weight: f64,

    /// Extra bonus for volume above the surge threshold (default: 5)
    pub volume_surge_weight: f64,

    /// Penalty for volume below the low-volume threshold (default: 5)
    pub low_volume_penalty: f64,

    /// Confidence points per percent of breakout magnitude (default: 5)
    pub magnitude_weight: f64,

    /// Cap on the magnitude contribution (default: 15)
    pub magnitude_cap: f64,

    /// Decimal places used to bucket breakout levels for dedup (default: 1)
    pub dedup_price_decimals: usize,

    /// Max factors listed on an emitted signal (default: 4)
    pub max_reasons: usize,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        BreakoutConfig {
            lookback: 20,
            rsi_period: 14,
            change_window_minutes: 15,

            volume_spike_threshold: 1.5,
            volume_surge_threshold: 3.0,
            low_volume_threshold: 0.8,

            sparkline_len: 20,

            base_score: 50.0,
            rsi_extreme_weight: 15.0,
            rsi_slope_penalty: 10.0,
            rsi_slope_bonus: 5.0,
            volume_spike_weight: 15.0,
            volume_surge_weight: 5.0,
            low_volume_penalty: 5.0,
            magnitude_weight: 5.0,
            magnitude_cap: 15.0,

            dedup_price_decimals: 1,
            max_reasons: 4,
        }
    }
}
