//! Trade-lifecycle simulator — replays one sized signal against forward bars.
//!
//! A single forward pass over the bars, no backtracking. Intrabar ordering is
//! conservative: the stop-loss is always checked before any take-profit on
//! the same bar, so a bar that touches both resolves as a stop.
//!
//! Lifecycle: `OPEN → partial TP fills → {CLOSED_SL | CLOSED_TP_FULL |
//! CLOSED_TIME | CLOSED_END}`. Firing TP1 arms the trailing stop; from then
//! on the stop can only tighten (ratchet), never loosen, even if ATR expands.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::domain::{Bar, EntryFill, Exit, ExitKind, Side, Signal, SignalError, Trade, TradeStatus};
use crate::risk::config::RiskConfig;
use crate::risk::sizer::SizingResult;

use super::cost::CostModel;

/// Simulation failures. `NoMarketData` is routine (caller skips the signal);
/// `InvalidSignal` is a caller contract violation surfaced before any bar is
/// consumed.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("no forward market data for signal {signal_id}")]
    NoMarketData { signal_id: String },
    #[error(transparent)]
    InvalidSignal(#[from] SignalError),
}

/// Internal lifecycle state of the position being replayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenPosition {
    side: Side,
    entry_price: Decimal,
    entry_time: DateTime<Utc>,
    original_quantity: Decimal,
    remaining: Decimal,
    /// Current stop price; trails once armed.
    stop: Decimal,
    trailing_armed: bool,
    tp_fired: [bool; 3],
    exits: Vec<Exit>,
}

impl OpenPosition {
    fn stop_breached(&self, bar: &Bar) -> bool {
        match self.side {
            Side::Long => bar.low <= self.stop,
            Side::Short => bar.high >= self.stop,
        }
    }

    fn tp_touched(&self, bar: &Bar, price: Decimal) -> bool {
        match self.side {
            Side::Long => bar.high >= price,
            Side::Short => bar.low <= price,
        }
    }

    fn all_tps_fired(&self) -> bool {
        self.tp_fired.iter().all(|fired| *fired)
    }
}

/// Replays sized signals bar by bar and produces finalized trades.
#[derive(Debug, Clone)]
pub struct TradeSimulator {
    config: RiskConfig,
}

impl TradeSimulator {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Simulate one sized signal against its forward bars.
    ///
    /// Bars must be in strictly ascending timestamp order; the first bar
    /// carries the entry fill, stop/TP checks begin on the next bar.
    pub fn simulate(
        &self,
        signal: &Signal,
        sizing: &SizingResult,
        bars: &[Bar],
        costs: &dyn CostModel,
    ) -> Result<Trade, SimulationError> {
        signal.validate()?;
        let entry_bar = bars.first().ok_or_else(|| SimulationError::NoMarketData {
            signal_id: signal.id.clone(),
        })?;

        let entry_price = costs.entry_fill_price(signal.side, signal.entry_price);
        let entry = EntryFill {
            timestamp: entry_bar.timestamp,
            price: entry_price,
            fee: costs.entry_fee(sizing.quantity * entry_price),
        };

        let mut position = OpenPosition {
            side: signal.side,
            entry_price,
            entry_time: entry_bar.timestamp,
            original_quantity: sizing.quantity,
            remaining: sizing.quantity,
            stop: signal.stop_loss,
            trailing_armed: false,
            tp_fired: [false; 3],
            exits: Vec::new(),
        };

        let max_holding = Duration::hours(self.config.max_holding_hours);
        let mut status = TradeStatus::Open;

        for bar in &bars[1..] {
            // Stop first: worst-case resolution when a bar spans both levels.
            if position.stop_breached(bar) {
                let stop = position.stop;
                self.close_remaining(&mut position, bar.timestamp, stop, ExitKind::StopLoss, costs);
                status = TradeStatus::ClosedStop;
                break;
            }

            for (index, level) in signal.targets.levels().into_iter().enumerate() {
                if position.tp_fired[index] || !position.tp_touched(bar, level.price) {
                    continue;
                }
                let kind = [ExitKind::Tp1, ExitKind::Tp2, ExitKind::Tp3][index];
                let quantity =
                    (position.original_quantity * level.exit_pct / dec!(100)).min(position.remaining);
                self.record_exit(
                    &mut position,
                    bar.timestamp,
                    level.price,
                    quantity,
                    kind,
                    costs,
                );
                position.tp_fired[index] = true;
                if index == 0 {
                    position.trailing_armed = true;
                    trace!(signal_id = %signal.id, "TP1 fired, trailing stop armed");
                }
            }
            if position.all_tps_fired() {
                status = TradeStatus::ClosedTpFull;
                break;
            }

            if position.trailing_armed {
                self.ratchet_stop(&mut position, signal, bar.close);
            }

            if bar.timestamp - position.entry_time > max_holding {
                self.close_remaining(&mut position, bar.timestamp, bar.close, ExitKind::Time, costs);
                status = TradeStatus::ClosedTime;
                break;
            }
        }

        if status == TradeStatus::Open {
            // Bars exhausted with quantity remaining: force-close at the final close.
            let last = bars.last().expect("bars checked non-empty above");
            self.close_remaining(&mut position, last.timestamp, last.close, ExitKind::EndOfData, costs);
            status = TradeStatus::ClosedEnd;
        }

        Ok(self.finalize(signal, sizing, entry, position, status, costs))
    }

    /// Tighten the stop while trailing is armed. For longs the stop is the
    /// higher of its current level, the breakeven floor, and close - k*ATR;
    /// mirrored for shorts. It never loosens.
    fn ratchet_stop(&self, position: &mut OpenPosition, signal: &Signal, close: Decimal) {
        let buffer = signal.entry_price * self.config.trailing.breakeven_buffer_bps / dec!(10000);
        let atr_distance = signal.atr.map(|atr| atr * self.config.trailing.atr_multiple);
        let candidate = match position.side {
            Side::Long => {
                let breakeven = signal.entry_price + buffer;
                match atr_distance {
                    Some(distance) => breakeven.max(close - distance),
                    None => breakeven,
                }
            }
            Side::Short => {
                let breakeven = signal.entry_price - buffer;
                match atr_distance {
                    Some(distance) => breakeven.min(close + distance),
                    None => breakeven,
                }
            }
        };
        position.stop = match position.side {
            Side::Long => position.stop.max(candidate),
            Side::Short => position.stop.min(candidate),
        };
    }

    fn record_exit(
        &self,
        position: &mut OpenPosition,
        timestamp: DateTime<Utc>,
        price: Decimal,
        quantity: Decimal,
        kind: ExitKind,
        costs: &dyn CostModel,
    ) {
        let notional = quantity * price;
        let pct_of_original = if position.original_quantity.is_zero() {
            Decimal::ZERO
        } else {
            quantity / position.original_quantity * dec!(100)
        };
        position.exits.push(Exit {
            timestamp,
            price,
            quantity,
            pct_of_original,
            kind,
            fee: costs.exit_fee(notional),
            slippage_cost: costs.exit_slippage(notional),
        });
        position.remaining -= quantity;
    }

    fn close_remaining(
        &self,
        position: &mut OpenPosition,
        timestamp: DateTime<Utc>,
        price: Decimal,
        kind: ExitKind,
        costs: &dyn CostModel,
    ) {
        if position.remaining > Decimal::ZERO {
            let quantity = position.remaining;
            self.record_exit(position, timestamp, price, quantity, kind, costs);
        }
    }

    /// Sum signed PnL across exits, apply fees, slippage and funding.
    fn finalize(
        &self,
        signal: &Signal,
        sizing: &SizingResult,
        entry: EntryFill,
        position: OpenPosition,
        status: TradeStatus,
        costs: &dyn CostModel,
    ) -> Trade {
        let sign = position.side.sign();
        let mut gross_pnl = Decimal::ZERO;
        let mut total_fees = entry.fee;
        let mut total_slippage = Decimal::ZERO;
        let mut funding_fees = Decimal::ZERO;

        for exit in &position.exits {
            gross_pnl += (exit.price - position.entry_price) * exit.quantity * sign;
            total_fees += exit.fee;
            total_slippage += exit.slippage_cost;
            // Funding accrues continuously on each tranche until it exits.
            let hours_held = hours_between(position.entry_time, exit.timestamp);
            funding_fees += costs.funding_fee(exit.quantity * position.entry_price, hours_held);
        }

        let net_pnl = gross_pnl - total_fees - total_slippage - funding_fees;
        let net_pnl_pct = if sizing.exposure_usd.is_zero() {
            Decimal::ZERO
        } else {
            net_pnl / sizing.exposure_usd * dec!(100)
        };

        Trade {
            signal_id: signal.id.clone(),
            symbol: signal.symbol.clone(),
            side: position.side,
            entry,
            quantity: position.original_quantity,
            position_size_usd: sizing.exposure_usd,
            leverage: sizing.leverage,
            exits: position.exits,
            gross_pnl,
            total_fees,
            total_slippage,
            funding_fees,
            net_pnl,
            net_pnl_pct,
            status,
        }
    }
}

/// Fractional hours between two timestamps.
fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    Decimal::from((end - start).num_seconds().max(0)) / dec!(3600)
}
