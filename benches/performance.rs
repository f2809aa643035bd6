//! Performance benchmarks for momentum-radar
//!
//! Run with: `cargo bench`
//! View results: `open target/criterion/report/index.html`

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use momentum_radar::breakout::{BreakoutConfig, BreakoutSignalEngine};
use momentum_radar::sector::{SectorAggregator, SectorConfig};
use momentum_radar::{BreakoutState, Market, PriceBar, StockFundamentalSnapshot, Symbol};

fn make_bars(count: usize) -> Vec<PriceBar> {
    (0..count)
        .map(|i| {
            let price = 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.01;
            PriceBar::new_unchecked(
                Utc.timestamp_millis_opt(1_700_000_000_000 + i as i64 * 6_000)
                    .unwrap(),
                price,
                100.0,
                price + 0.5,
                price - 0.5,
                1_000.0 + (i % 7) as f64 * 100.0,
            )
        })
        .collect()
}

fn make_snapshots(count: usize) -> Vec<StockFundamentalSnapshot> {
    let sectors = [
        "Technology",
        "Energy",
        "Financial Services",
        "Healthcare",
        "Utilities",
    ];
    (0..count)
        .map(|i| StockFundamentalSnapshot {
            symbol: Symbol::new(format!("NYSE:S{}", i)),
            name: format!("Stock {}", i),
            sector: sectors[i % sectors.len()].to_string(),
            exchange: "NYSE".to_string(),
            currency: "USD".to_string(),
            current_price: 50.0 + (i % 90) as f64,
            open_price: 49.0 + (i % 90) as f64,
            change_percent: ((i % 11) as f64 - 5.0) * 0.4,
            fifty_two_week_high: 160.0,
            fifty_two_week_low: 40.0,
            insider_net_percent: ((i % 5) as f64 - 2.0) * 0.01,
            institutional_held_percent: (i % 10) as f64 * 0.08,
            volume: 1_000.0 + (i % 13) as f64 * 250.0,
            average_volume: 1_000.0,
            market_cap: (i as f64 + 1.0) * 1_000_000.0,
        })
        .collect()
}

fn benchmark_breakout_scan(c: &mut Criterion) {
    let engine = BreakoutSignalEngine::new(BreakoutConfig::default());
    let bars = make_bars(256);
    let symbol = Symbol::new("NASDAQ:BENCH");
    let state = BreakoutState::default();

    c.bench_function("breakout_scan_256_bars", |b| {
        b.iter(|| engine.scan(black_box(&symbol), None, black_box(&bars), black_box(&state)))
    });
}

fn benchmark_sector_aggregate(c: &mut Criterion) {
    let aggregator = SectorAggregator::new(SectorConfig::default());
    let snapshots = make_snapshots(500);

    c.bench_function("sector_aggregate_500_stocks", |b| {
        b.iter(|| aggregator.aggregate(Market::Us, black_box(&snapshots)))
    });
}

criterion_group!(benches, benchmark_breakout_scan, benchmark_sector_aggregate);
criterion_main!(benches);
