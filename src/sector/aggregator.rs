//! Sector sentiment aggregation
//!
//! Per-stock derivation (R-Factor, intraday trend, strong-money score) runs
//! in parallel over the snapshot batch; the rollup itself is a plain
//! single-threaded reduction over the completed results. A bad row is
//! dropped and counted, never fatal to the batch.

use std::cmp::Ordering;

use itertools::Itertools;
use rayon::prelude::*;
use tracing::debug;

use crate::indicators;
use crate::{
    Market, MarketSummary, SectorAnalysis, SectorHeatmapRow, Sentiment, StockAnalysis,
    StockFundamentalSnapshot, StrongMoneySignal, TrendDirection,
};

use super::normalize::{normalize_sector, DATA_UNAVAILABLE};
use super::SectorConfig;

/// A/D ratio reported when a group has advancers but no decliners
const AD_RATIO_NO_DECLINERS: f64 = 999.0;

/// A/D ratio reported when nothing in a group moved either way
const AD_RATIO_FLAT: f64 = 1.0;

pub struct SectorAggregator {
    config: SectorConfig,
}

impl SectorAggregator {
    pub fn new(config: SectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SectorConfig {
        &self.config
    }

    /// Run a full aggregation pass over a snapshot batch.
    ///
    /// Rows without usable data are excluded before grouping but still
    /// counted, so `total_stocks_analyzed` always equals the batch size
    /// while `total_stocks_with_data` reflects what actually flowed into
    /// the rollups.
    pub fn aggregate(
        &self,
        market: Market,
        snapshots: &[StockFundamentalSnapshot],
    ) -> SectorAnalysis {
        let total_stocks_analyzed = snapshots.len();

        let analyses: Vec<StockAnalysis> = snapshots
            .par_iter()
            .filter_map(|snapshot| self.analyze_stock(snapshot))
            .collect();
        let total_stocks_with_data = analyses.len();

        if total_stocks_with_data < total_stocks_analyzed {
            debug!(
                market = %market,
                dropped = total_stocks_analyzed - total_stocks_with_data,
                "excluded snapshots without usable data"
            );
        }

        let market_summary = self.market_rollup(&analyses);

        let groups = analyses.into_iter().into_group_map_by(|a| a.sector.clone());

        let mut ranked: Vec<(SectorHeatmapRow, Vec<StockAnalysis>)> = groups
            .into_iter()
            .map(|(sector, mut stocks)| {
                let row = self.sector_rollup(&sector, &stocks);
                stocks.sort_by(compare_stocks);
                stocks.truncate(self.config.top_per_sector);
                (row, stocks)
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.0.weighted_change_percent
                .partial_cmp(&a.0.weighted_change_percent)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.sector.cmp(&b.0.sector))
        });

        let mut sectors = Vec::with_capacity(ranked.len());
        let mut stocks = Vec::new();
        for (row, group) in ranked {
            sectors.push(row);
            stocks.extend(group);
        }

        SectorAnalysis {
            market,
            stocks,
            sectors,
            market_summary,
            total_stocks_analyzed,
            total_stocks_with_data,
        }
    }

    /// Derive the per-stock analysis record, or None when the snapshot has
    /// no usable data (excluded and counted by the caller of this method)
    pub fn analyze_stock(&self, snapshot: &StockFundamentalSnapshot) -> Option<StockAnalysis> {
        if !self.has_usable_data(snapshot) {
            return None;
        }

        let cfg = &self.config;
        let r_factor = r_factor(
            snapshot.current_price,
            snapshot.fifty_two_week_high,
            snapshot.fifty_two_week_low,
        );

        let intraday_trend =
            if snapshot.current_price >= snapshot.open_price * (1.0 - cfg.intraday_buffer) {
                TrendDirection::Bullish
            } else {
                TrendDirection::Bearish
            };

        // Additive rule table; reasons keep evaluation order
        let mut score = 0i32;
        let mut reasons = Vec::new();

        if snapshot.insider_net_percent > cfg.insider_threshold {
            score += 2;
            reasons.push("Insiders Buying".to_string());
        } else if snapshot.insider_net_percent < -cfg.insider_threshold {
            score -= 2;
            reasons.push("Insiders Selling".to_string());
        }

        if snapshot.institutional_held_percent > cfg.institutional_threshold {
            score += 1;
            reasons.push(format!(
                "Institutions Hold {:.1}%",
                snapshot.institutional_held_percent * 100.0
            ));
        }

        if r_factor > cfg.strong_momentum_band {
            score += 1;
            reasons.push("Strong Momentum".to_string());
        } else if r_factor < cfg.weak_momentum_band {
            score -= 1;
            reasons.push("Weak Momentum".to_string());
        }
        if r_factor > cfg.extreme_momentum_band {
            score += 1;
            reasons.push("Near 52-Week High".to_string());
        }

        if let Some(multiple) =
            indicators::volume_multiple(snapshot.volume, snapshot.average_volume)
        {
            if multiple > cfg.volume_spike_threshold {
                score += 1;
                reasons.push(format!(
                    "Volume Surge ({})",
                    indicators::format_volume_multiple(multiple)
                ));
            }
        }

        match intraday_trend {
            TrendDirection::Bullish => {
                score += 2;
                reasons.push("Rising Today".to_string());
            }
            TrendDirection::Bearish => {
                score -= 1;
                reasons.push("Profit Booking".to_string());
            }
        }

        let strong_money_signal = if score >= cfg.signal_cutoff {
            StrongMoneySignal::Buying
        } else if score <= -cfg.signal_cutoff {
            StrongMoneySignal::Selling
        } else {
            StrongMoneySignal::Neutral
        };

        Some(StockAnalysis {
            sector: normalize_sector(&snapshot.sector),
            snapshot: snapshot.clone(),
            r_factor,
            intraday_trend,
            strong_money_signal,
            strong_money_score: score,
            reasons,
        })
    }

    fn has_usable_data(&self, snapshot: &StockFundamentalSnapshot) -> bool {
        snapshot.sector != DATA_UNAVAILABLE
            && snapshot.current_price.is_finite()
            && snapshot.current_price > 0.0
            && snapshot.open_price.is_finite()
            && snapshot.open_price > 0.0
            && snapshot.change_percent.is_finite()
    }

    fn sector_rollup(&self, sector: &str, stocks: &[StockAnalysis]) -> SectorHeatmapRow {
        let stock_count = stocks.len();
        let avg_r_factor = if stock_count > 0 {
            stocks.iter().map(|s| s.r_factor).sum::<f64>() / stock_count as f64
        } else {
            0.0
        };

        let buying_stocks = stocks
            .iter()
            .filter(|s| s.strong_money_signal == StrongMoneySignal::Buying)
            .count();
        let selling_stocks = stocks
            .iter()
            .filter(|s| s.strong_money_signal == StrongMoneySignal::Selling)
            .count();

        let advancing_stocks = stocks
            .iter()
            .filter(|s| s.snapshot.change_percent > 0.0)
            .count();
        let declining_stocks = stocks
            .iter()
            .filter(|s| s.snapshot.change_percent < 0.0)
            .count();
        let ad_ratio = ad_ratio(advancing_stocks, declining_stocks);

        let (weighted_change_percent, total_market_cap) = weighted_change(stocks);

        let strong_money_intensity = if stock_count > 0 {
            let total_score: i32 = stocks.iter().map(|s| s.strong_money_score).sum();
            (total_score as f64 / (stock_count as i32 * self.config.max_stock_score) as f64
                * 100.0)
                .clamp(-100.0, 100.0)
        } else {
            0.0
        };

        SectorHeatmapRow {
            sector: sector.to_string(),
            stock_count,
            avg_r_factor,
            strong_money_intensity,
            buying_stocks,
            selling_stocks,
            advancing_stocks,
            declining_stocks,
            ad_ratio,
            weighted_change_percent,
            total_market_cap,
            sentiment: self.sentiment(ad_ratio),
        }
    }

    fn market_rollup(&self, stocks: &[StockAnalysis]) -> MarketSummary {
        let advancing_stocks = stocks
            .iter()
            .filter(|s| s.snapshot.change_percent > 0.0)
            .count();
        let declining_stocks = stocks
            .iter()
            .filter(|s| s.snapshot.change_percent < 0.0)
            .count();
        let ratio = ad_ratio(advancing_stocks, declining_stocks);
        let (weighted_change_percent, total_market_cap) = weighted_change(stocks);

        MarketSummary {
            advancing_stocks,
            declining_stocks,
            ad_ratio: ratio,
            sentiment: self.sentiment(ratio),
            weighted_change_percent,
            total_market_cap,
        }
    }

    fn sentiment(&self, ad_ratio: f64) -> Sentiment {
        if ad_ratio > self.config.bullish_ad_ratio {
            Sentiment::Bullish
        } else if ad_ratio < self.config.bearish_ad_ratio {
            Sentiment::Bearish
        } else {
            Sentiment::Neutral
        }
    }
}

/// Position in the 52-week range as 0..=100; 50 when the range is degenerate,
/// clamped when the price sits outside the recorded range
fn r_factor(price: f64, high_52w: f64, low_52w: f64) -> f64 {
    let range = high_52w - low_52w;
    if !range.is_finite() || range <= 0.0 {
        return 50.0;
    }
    ((price - low_52w) / range * 100.0).clamp(0.0, 100.0)
}

/// Advance/decline ratio with its two sentinels: 999 when nothing declined
/// and something advanced, 1 when nothing moved either way
fn ad_ratio(advancing: usize, declining: usize) -> f64 {
    if declining == 0 {
        if advancing > 0 {
            AD_RATIO_NO_DECLINERS
        } else {
            AD_RATIO_FLAT
        }
    } else {
        advancing as f64 / declining as f64
    }
}

/// Market-cap-weighted percent change over stocks with usable caps.
/// Returns (weighted change, total cap); both zero when no stock has cap data.
fn weighted_change(stocks: &[StockAnalysis]) -> (f64, f64) {
    let mut weighted_sum = 0.0;
    let mut total_cap = 0.0;
    for stock in stocks {
        let cap = stock.snapshot.market_cap;
        if cap.is_finite() && cap > 0.0 {
            weighted_sum += stock.snapshot.change_percent * cap;
            total_cap += cap;
        }
    }
    if total_cap > 0.0 {
        (weighted_sum / total_cap, total_cap)
    } else {
        (0.0, 0.0)
    }
}

/// Bullish-intraday stocks first, then by R-Factor descending
fn compare_stocks(a: &StockAnalysis, b: &StockAnalysis) -> Ordering {
    let a_bullish = a.intraday_trend == TrendDirection::Bullish;
    let b_bullish = b.intraday_trend == TrendDirection::Bullish;
    b_bullish.cmp(&a_bullish).then_with(|| {
        b.r_factor
            .partial_cmp(&a.r_factor)
            .unwrap_or(Ordering::Equal)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;

    fn snapshot(symbol: &str, sector: &str) -> StockFundamentalSnapshot {
        StockFundamentalSnapshot {
            symbol: Symbol::new(symbol),
            name: symbol.to_string(),
            sector: sector.to_string(),
            exchange: "NASDAQ".to_string(),
            currency: "USD".to_string(),
            current_price: 100.0,
            open_price: 98.0,
            change_percent: 1.5,
            fifty_two_week_high: 150.0,
            fifty_two_week_low: 50.0,
            insider_net_percent: 0.0,
            institutional_held_percent: 0.0,
            volume: 1_000.0,
            average_volume: 1_000.0,
            market_cap: 1_000_000.0,
        }
    }

    fn aggregator() -> SectorAggregator {
        SectorAggregator::new(SectorConfig::default())
    }

    #[test]
    fn test_r_factor_degenerate_range_is_50() {
        assert_eq!(r_factor(100.0, 100.0, 100.0), 50.0);
        assert_eq!(r_factor(100.0, 90.0, 110.0), 50.0);
    }

    #[test]
    fn test_r_factor_clamps_outside_range() {
        assert_eq!(r_factor(40.0, 150.0, 50.0), 0.0);
        assert_eq!(r_factor(160.0, 150.0, 50.0), 100.0);
        let mid = r_factor(100.0, 150.0, 50.0);
        assert!((mid - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_ad_ratio_sentinels() {
        assert_eq!(ad_ratio(4, 0), 999.0);
        assert_eq!(ad_ratio(0, 0), 1.0);
        assert_eq!(ad_ratio(0, 3), 0.0);
        assert!((ad_ratio(3, 2) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_strong_money_scenario_scores_seven() {
        let agg = aggregator();
        let mut snap = snapshot("NASDAQ:ACME", "Technology");
        snap.insider_net_percent = 0.02;
        snap.institutional_held_percent = 0.35;
        // (135 - 50) / (150 - 50) = 0.85 -> r_factor 85
        snap.current_price = 135.0;
        snap.open_price = 130.0;
        snap.volume = 2_000.0;
        snap.average_volume = 1_000.0;

        let analysis = agg.analyze_stock(&snap).unwrap();

        assert!((analysis.r_factor - 85.0).abs() < 1e-9);
        assert_eq!(analysis.intraday_trend, TrendDirection::Bullish);
        assert_eq!(analysis.strong_money_score, 7);
        assert_eq!(analysis.strong_money_signal, StrongMoneySignal::Buying);
        assert_eq!(analysis.reasons.len(), 5);
        assert_eq!(analysis.reasons[0], "Insiders Buying");
        assert_eq!(analysis.reasons.last().unwrap(), "Rising Today");
    }

    #[test]
    fn test_intraday_buffer_avoids_flip_at_open() {
        let agg = aggregator();
        let mut snap = snapshot("X", "Energy");
        snap.open_price = 100.0;
        // Just under the open but within the 0.1% buffer
        snap.current_price = 99.95;
        let analysis = agg.analyze_stock(&snap).unwrap();
        assert_eq!(analysis.intraday_trend, TrendDirection::Bullish);

        snap.current_price = 99.5;
        let analysis = agg.analyze_stock(&snap).unwrap();
        assert_eq!(analysis.intraday_trend, TrendDirection::Bearish);
    }

    #[test]
    fn test_unusable_rows_rejected() {
        let agg = aggregator();

        let mut bad_price = snapshot("A", "Energy");
        bad_price.current_price = 0.0;
        assert!(agg.analyze_stock(&bad_price).is_none());

        let mut bad_change = snapshot("B", "Energy");
        bad_change.change_percent = f64::NAN;
        assert!(agg.analyze_stock(&bad_change).is_none());

        let placeholder = snapshot("C", DATA_UNAVAILABLE);
        assert!(agg.analyze_stock(&placeholder).is_none());
    }

    #[test]
    fn test_weighted_change_equal_caps_is_plain_average() {
        let agg = aggregator();
        let mut snaps = Vec::new();
        for (i, change) in [1.0, 2.0, 3.0].iter().enumerate() {
            let mut s = snapshot(&format!("S{}", i), "Energy");
            s.change_percent = *change;
            s.market_cap = 5_000_000.0;
            snaps.push(s);
        }
        let stocks: Vec<StockAnalysis> =
            snaps.iter().filter_map(|s| agg.analyze_stock(s)).collect();

        let (weighted, total_cap) = weighted_change(&stocks);
        assert!((weighted - 2.0).abs() < 1e-9);
        assert!((total_cap - 15_000_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_weighted_change_zero_without_caps() {
        let agg = aggregator();
        let mut snap = snapshot("S", "Energy");
        snap.market_cap = 0.0;
        let stocks = vec![agg.analyze_stock(&snap).unwrap()];

        let (weighted, total_cap) = weighted_change(&stocks);
        assert_eq!(weighted, 0.0);
        assert_eq!(total_cap, 0.0);
    }

    #[test]
    fn test_aggregate_counts_analyzed_vs_usable() {
        let agg = aggregator();
        let mut batch = Vec::new();
        for i in 0..4 {
            batch.push(snapshot(&format!("OK{}", i), "Technology"));
        }
        for i in 0..4 {
            batch.push(snapshot(&format!("NA{}", i), DATA_UNAVAILABLE));
        }

        let result = agg.aggregate(Market::Us, &batch);

        assert_eq!(result.total_stocks_analyzed, 8);
        assert_eq!(result.total_stocks_with_data, 4);
        assert_eq!(result.stocks.len(), 4);
    }

    #[test]
    fn test_all_advancing_sector_is_bullish() {
        let agg = aggregator();
        let batch: Vec<_> = (0..4)
            .map(|i| {
                let mut s = snapshot(&format!("S{}", i), "Energy");
                s.change_percent = 0.5 + i as f64;
                s
            })
            .collect();

        let result = agg.aggregate(Market::Us, &batch);

        assert_eq!(result.sectors.len(), 1);
        let row = &result.sectors[0];
        assert_eq!(row.advancing_stocks, 4);
        assert_eq!(row.declining_stocks, 0);
        assert_eq!(row.ad_ratio, 999.0);
        assert_eq!(row.sentiment, Sentiment::Bullish);
    }

    #[test]
    fn test_stocks_ranked_bullish_first_then_r_factor() {
        let agg = aggregator();
        let mut batch = Vec::new();

        let mut falling = snapshot("FALL", "Energy");
        falling.current_price = 140.0; // high r_factor but bearish intraday
        falling.open_price = 150.0;
        batch.push(falling);

        let mut low_rf = snapshot("LOWRF", "Energy");
        low_rf.current_price = 60.0;
        low_rf.open_price = 58.0;
        batch.push(low_rf);

        let mut high_rf = snapshot("HIGHRF", "Energy");
        high_rf.current_price = 145.0;
        high_rf.open_price = 140.0;
        batch.push(high_rf);

        let result = agg.aggregate(Market::Us, &batch);

        let order: Vec<&str> = result
            .stocks
            .iter()
            .map(|s| s.snapshot.symbol.as_str())
            .collect();
        assert_eq!(order, vec!["HIGHRF", "LOWRF", "FALL"]);
    }

    #[test]
    fn test_top_per_sector_truncates() {
        let config = SectorConfig {
            top_per_sector: 2,
            ..Default::default()
        };
        let agg = SectorAggregator::new(config);
        let batch: Vec<_> = (0..5).map(|i| snapshot(&format!("S{}", i), "Energy")).collect();

        let result = agg.aggregate(Market::In, &batch);

        assert_eq!(result.stocks.len(), 2);
        // Rollups still cover the whole sector
        assert_eq!(result.sectors[0].stock_count, 5);
    }

    #[test]
    fn test_sector_normalization_groups_variants() {
        let agg = aggregator();
        let batch = vec![
            snapshot("A", "Technology"),
            snapshot("B", "Information Technology"),
        ];

        let result = agg.aggregate(Market::Us, &batch);

        assert_eq!(result.sectors.len(), 1);
        assert_eq!(result.sectors[0].sector, "Information Technology");
        assert_eq!(result.sectors[0].stock_count, 2);
    }

    #[test]
    fn test_empty_batch_reports_no_data() {
        let agg = aggregator();
        let result = agg.aggregate(Market::Us, &[]);

        assert_eq!(result.total_stocks_analyzed, 0);
        assert_eq!(result.total_stocks_with_data, 0);
        assert!(result.sectors.is_empty());
        assert_eq!(result.market_summary.ad_ratio, 1.0);
        assert_eq!(result.market_summary.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_strong_money_intensity_bounded() {
        let agg = aggregator();
        let batch: Vec<_> = (0..3)
            .map(|i| {
                let mut s = snapshot(&format!("S{}", i), "Energy");
                s.insider_net_percent = 0.05;
                s.institutional_held_percent = 0.60;
                s.current_price = 149.0;
                s.open_price = 145.0;
                s.volume = 3_000.0;
                s
            })
            .collect();

        let result = agg.aggregate(Market::Us, &batch);
        let intensity = result.sectors[0].strong_money_intensity;
        assert!((-100.0..=100.0).contains(&intensity));
        assert!(intensity > 0.0);
    }
}
