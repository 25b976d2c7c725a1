//! Property tests for sizing and lifecycle invariants.
//!
//! Uses proptest to verify:
//! 1. Sized positions never breach the per-symbol cap and always respect the
//!    lot step and min-notional floor
//! 2. Sizing is a pure function — same inputs, same outcome
//! 3. TP ladder weight conservation — partial exit quantities sum exactly to
//!    the original quantity
//! 4. Ratchet monotonicity — once TP1 arms the trail, a stop exit never
//!    executes below the breakeven floor
//! 5. Conservative intrabar ordering — a bar spanning stop and TP resolves
//!    as a stop

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use siglab_core::domain::{
    Bar, ExitKind, PortfolioSnapshot, Side, Signal, TpLadder, TpLevel, TradeStatus,
};
use siglab_core::risk::{PositionSizer, ProfileRegistry, RiskConfig, RiskTier, SizingResult};
use siglab_core::sim::{Frictionless, TradeSimulator};

// ── Strategies (proptest) ────────────────────────────────────────────

/// Entry price in [50, 500] with two decimal places.
fn arb_entry() -> impl Strategy<Value = Decimal> {
    (5_000i64..50_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Stop distance as a fraction of entry, 1%..5%.
fn arb_stop_frac() -> impl Strategy<Value = Decimal> {
    (100i64..500).prop_map(|bps| Decimal::new(bps, 4))
}

fn arb_capital() -> impl Strategy<Value = Decimal> {
    (1_000i64..100_000).prop_map(Decimal::from)
}

/// TP weights that sum to exactly 100.
fn arb_weights() -> impl Strategy<Value = (Decimal, Decimal, Decimal)> {
    (10i64..50, 10i64..40).prop_map(|(w1, w2)| {
        (
            Decimal::from(w1),
            Decimal::from(w2),
            Decimal::from(100 - w1 - w2),
        )
    })
}

fn long_signal_at(entry: Decimal, stop_frac: Decimal) -> Signal {
    let stop_loss = entry * (Decimal::ONE - stop_frac);
    Signal {
        id: "prop-1".into(),
        symbol: "SOLUSDT".into(),
        side: Side::Long,
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        entry_price: entry,
        stop_loss,
        targets: TpLadder {
            tp1: TpLevel {
                price: entry * dec!(1.03),
                exit_pct: dec!(30),
            },
            tp2: TpLevel {
                price: entry * dec!(1.06),
                exit_pct: dec!(40),
            },
            tp3: TpLevel {
                price: entry * dec!(1.10),
                exit_pct: dec!(30),
            },
        },
        confidence: 0.7,
        atr: Some(entry * dec!(0.015)),
        requested_leverage: None,
    }
}

fn ladder_signal(weights: (Decimal, Decimal, Decimal)) -> Signal {
    let mut sig = long_signal_at(dec!(100), dec!(0.02));
    sig.targets.tp1.exit_pct = weights.0;
    sig.targets.tp2.exit_pct = weights.1;
    sig.targets.tp3.exit_pct = weights.2;
    sig
}

fn bar_at(hour: i64, close: Decimal) -> Bar {
    Bar {
        symbol: "SOLUSDT".into(),
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + Duration::hours(hour),
        open: close,
        high: close + dec!(0.5),
        low: close - dec!(0.5),
        close,
        volume: dec!(1000),
    }
}

fn sizer() -> PositionSizer {
    PositionSizer::new(RiskConfig::default(), ProfileRegistry::standard())
}

// ── 1. Sizing caps ───────────────────────────────────────────────────

proptest! {
    /// A sized position respects the per-symbol cap, the lot step, the
    /// min-notional floor, and places liquidation strictly beyond the stop.
    #[test]
    fn sized_position_respects_all_limits(
        entry in arb_entry(),
        stop_frac in arb_stop_frac(),
        capital in arb_capital(),
    ) {
        let sizer = sizer();
        let signal = long_signal_at(entry, stop_frac);
        let outcome = sizer
            .size(&signal, RiskTier::Medium, capital, &PortfolioSnapshot::empty())
            .unwrap();

        if let Some(result) = outcome.sized() {
            let profile = sizer.profiles().get(RiskTier::Medium);
            let config = sizer.config();

            prop_assert!(result.exposure_usd <= profile.cap_per_symbol * capital);
            prop_assert!(result.exposure_usd >= config.exchange.min_notional);
            prop_assert!(result.leverage >= 1);
            prop_assert!(result.leverage <= profile.max_leverage);

            // Quantity is an exact multiple of the lot step.
            let steps = result.quantity / config.exchange.lot_step;
            prop_assert_eq!(steps.fract(), Decimal::ZERO);

            // Longs liquidate strictly below the stop.
            prop_assert!(result.liquidation_price < signal.stop_loss);
        }
    }

    /// Sizing is pure: identical inputs always produce identical outcomes.
    #[test]
    fn sizing_is_deterministic(
        entry in arb_entry(),
        stop_frac in arb_stop_frac(),
        capital in arb_capital(),
    ) {
        let sizer = sizer();
        let signal = long_signal_at(entry, stop_frac);
        let snapshot = PortfolioSnapshot::empty();
        let first = sizer.size(&signal, RiskTier::Low, capital, &snapshot).unwrap();
        let second = sizer.size(&signal, RiskTier::Low, capital, &snapshot).unwrap();

        match (first.sized(), second.sized()) {
            (Some(a), Some(b)) => {
                prop_assert_eq!(a.quantity, b.quantity);
                prop_assert_eq!(a.exposure_usd, b.exposure_usd);
                prop_assert_eq!(a.leverage, b.leverage);
            }
            (None, None) => {}
            _ => prop_assert!(false, "outcomes diverged on identical inputs"),
        }
    }
}

// ── 2. Ladder weight conservation ────────────────────────────────────

proptest! {
    /// Whatever the weight split, a full ladder fill exits exactly the
    /// original quantity: no dust left behind, no over-exit.
    #[test]
    fn tp_ladder_conserves_quantity(weights in arb_weights()) {
        let signal = ladder_signal(weights);
        let sizing = SizingResult {
            quantity: dec!(2.5),
            leverage: 5,
            exposure_usd: dec!(250),
            margin_usd: dec!(50),
            liquidation_price: dec!(79.5),
        };
        // Tape walks straight through every rung.
        let bars = vec![
            bar_at(0, dec!(100)),
            bar_at(1, dec!(103.2)),
            bar_at(2, dec!(106.2)),
            bar_at(3, dec!(110.2)),
        ];
        let trade = TradeSimulator::new(RiskConfig::default())
            .simulate(&signal, &sizing, &bars, &Frictionless)
            .unwrap();

        prop_assert_eq!(trade.status, TradeStatus::ClosedTpFull);
        let qty_sum: Decimal = trade.exits.iter().map(|e| e.quantity).sum();
        let pct_sum: Decimal = trade.exits.iter().map(|e| e.pct_of_original).sum();
        prop_assert_eq!(qty_sum, sizing.quantity);
        prop_assert_eq!(pct_sum, dec!(100));
    }
}

// ── 3. Ratchet monotonicity ──────────────────────────────────────────

proptest! {
    /// After TP1 arms the trail, a later stop-out can never execute below
    /// the breakeven floor, no matter how far price collapses.
    #[test]
    fn armed_stop_never_executes_below_breakeven(
        run_up in 1i64..8,
        crash in 3_000i64..9_000,
    ) {
        let signal = long_signal_at(dec!(100), dec!(0.02));
        let sizing = SizingResult {
            quantity: dec!(1),
            leverage: 5,
            exposure_usd: dec!(100),
            margin_usd: dec!(20),
            liquidation_price: dec!(79.5),
        };
        // Fire TP1, drift upward for a few bars, then collapse.
        let mut bars = vec![bar_at(0, dec!(100)), bar_at(1, dec!(103.2))];
        for i in 0..run_up {
            bars.push(bar_at(2 + i, dec!(103.5) + Decimal::new(i * 20, 2)));
        }
        bars.push(bar_at(2 + run_up, Decimal::new(crash, 2)));

        let trade = TradeSimulator::new(RiskConfig::default())
            .simulate(&signal, &sizing, &bars, &Frictionless)
            .unwrap();

        if trade.status == TradeStatus::ClosedStop {
            let stop_exit = trade.exits.last().unwrap();
            prop_assert_eq!(stop_exit.kind, ExitKind::StopLoss);
            // Breakeven floor: entry + 10 bps.
            prop_assert!(stop_exit.price >= dec!(100.1));
        }
    }
}

// ── 4. Conservative intrabar ordering ────────────────────────────────

proptest! {
    /// A bar whose range covers both the stop and a TP always resolves as a
    /// stop, regardless of how far beyond the TP the high reaches.
    #[test]
    fn spanning_bar_resolves_as_stop(overshoot in 0i64..2_000) {
        let signal = long_signal_at(dec!(100), dec!(0.02));
        let sizing = SizingResult {
            quantity: dec!(1),
            leverage: 5,
            exposure_usd: dec!(100),
            margin_usd: dec!(20),
            liquidation_price: dec!(79.5),
        };
        let mut span = bar_at(1, dec!(100));
        span.low = dec!(97.5);
        span.high = dec!(103) + Decimal::new(overshoot, 2);
        let bars = vec![bar_at(0, dec!(100)), span];

        let trade = TradeSimulator::new(RiskConfig::default())
            .simulate(&signal, &sizing, &bars, &Frictionless)
            .unwrap();

        prop_assert_eq!(trade.status, TradeStatus::ClosedStop);
        prop_assert!(!trade.hit(ExitKind::Tp1));
        prop_assert_eq!(trade.exits.len(), 1);
    }
}
