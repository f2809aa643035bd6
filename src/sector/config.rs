//! Sector aggregation configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorConfig {
    /// Stocks kept per sector after ranking (default: 15)
    pub top_per_sector: usize,

    /// Buffer around the session open before a stock counts as Bearish
    /// intraday; prevents flip-flopping right at the open (default: 0.001)
    pub intraday_buffer: f64,

    /// Net insider buying fraction treated as a buy signal (default: 0.01)
    pub insider_threshold: f64,

    /// Institutional holding fraction treated as sticky ownership
    /// (default: 0.30)
    pub institutional_threshold: f64,

    /// Volume multiple treated as unusual participation (default: 1.5)
    pub volume_spike_threshold: f64,

    /// R-Factor below which momentum counts against the stock (default: 20)
    pub weak_momentum_band: f64,

    /// R-Factor above which momentum counts for the stock (default: 80)
    pub strong_momentum_band: f64,

    /// R-Factor above which an extra momentum point is granted (default: 90)
    pub extreme_momentum_band: f64,

    /// Absolute score at which a stock classifies as Buying/Selling
    /// (default: 2)
    pub signal_cutoff: i32,

    /// Approximate max per-stock score, used to normalize sector intensity
    /// (default: 5)
    pub max_stock_score: i32,

    /// A/D ratio above which a group is Bullish (default: 1.5)
    pub bullish_ad_ratio: f64,

    /// A/D ratio below which a group is Bearish (default: 0.7)
    pub bearish_ad_ratio: f64,
}

impl Default for SectorConfig {
    fn default() -> Self {
        SectorConfig {
            top_per_sector: 15,
            intraday_buffer: 0.001,

            insider_threshold: 0.01,
            institutional_threshold: 0.30,
            volume_spike_threshold: 1.5,

            weak_momentum_band: 20.0,
            strong_momentum_band: 80.0,
            extreme_momentum_band: 90.0,

            signal_cutoff: 2,
            max_stock_score: 5,

            bullish_ad_ratio: 1.5,
            bearish_ad_ratio: 0.7,
        }
    }
}
