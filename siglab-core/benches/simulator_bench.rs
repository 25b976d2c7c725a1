//! Criterion benchmarks for the hot paths.
//!
//! Benchmarks:
//! 1. Position sizing (full constraint chain per signal)
//! 2. Trade simulation over synthetic tapes of increasing length

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use siglab_core::domain::{Bar, PortfolioSnapshot, Side, Signal, TpLadder, TpLevel};
use siglab_core::risk::{PositionSizer, ProfileRegistry, RiskConfig, RiskTier};
use siglab_core::sim::{FlatCostModel, TradeSimulator};

fn make_signal() -> Signal {
    Signal {
        id: "bench-1".into(),
        symbol: "BTCUSDT".into(),
        side: Side::Long,
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        entry_price: dec!(100),
        stop_loss: dec!(98),
        targets: TpLadder {
            tp1: TpLevel {
                price: dec!(103),
                exit_pct: dec!(30),
            },
            tp2: TpLevel {
                price: dec!(106),
                exit_pct: dec!(40),
            },
            tp3: TpLevel {
                price: dec!(110),
                exit_pct: dec!(30),
            },
        },
        confidence: 0.8,
        atr: Some(dec!(1.5)),
        requested_leverage: None,
    }
}

/// Hourly random walk around the entry, wide enough to keep the position
/// open for most of the tape.
fn make_bars(n: usize) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(42);
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut close_cents: i64 = 10_000;
    (0..n)
        .map(|i| {
            close_cents += rng.gen_range(-30..=30);
            let close = Decimal::new(close_cents, 2);
            Bar {
                symbol: "BTCUSDT".into(),
                timestamp: t0 + Duration::hours(i as i64),
                open: close,
                high: close + dec!(0.40),
                low: close - dec!(0.40),
                close,
                volume: Decimal::from(rng.gen_range(500u32..5_000)),
            }
        })
        .collect()
}

fn bench_sizing(c: &mut Criterion) {
    let sizer = PositionSizer::new(RiskConfig::default(), ProfileRegistry::standard());
    let signal = make_signal();
    let snapshot = PortfolioSnapshot::empty();

    c.bench_function("size_single_signal", |b| {
        b.iter(|| {
            let outcome = sizer
                .size(
                    black_box(&signal),
                    RiskTier::Medium,
                    dec!(10_000),
                    &snapshot,
                )
                .unwrap();
            black_box(outcome)
        })
    });
}

fn bench_simulation(c: &mut Criterion) {
    let sizer = PositionSizer::new(RiskConfig::default(), ProfileRegistry::standard());
    let simulator = TradeSimulator::new(RiskConfig::default());
    let costs = FlatCostModel::new(RiskConfig::default().fees);
    let signal = make_signal();
    let sizing = *sizer
        .size(&signal, RiskTier::Medium, dec!(10_000), &PortfolioSnapshot::empty())
        .unwrap()
        .sized()
        .unwrap();

    let mut group = c.benchmark_group("simulate_trade");
    for n in [100usize, 1_000, 10_000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| {
                let trade = simulator
                    .simulate(black_box(&signal), &sizing, bars, &costs)
                    .unwrap();
                black_box(trade)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sizing, bench_simulation);
criterion_main!(benches);
