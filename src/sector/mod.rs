//! Sector Aggregator
//!
//! Buckets per-symbol fundamental snapshots into canonical sectors and rolls
//! up advance/decline ratios, market-cap-weighted change, and strong-money
//! pressure into a ranked heatmap. Runs on a coarser cadence than the
//! breakout engine and carries no state between calls.

pub mod aggregator;
pub mod config;
pub mod normalize;

pub use aggregator::SectorAggregator;
pub use config::SectorConfig;
pub use normalize::{normalize_sector, DATA_UNAVAILABLE};
