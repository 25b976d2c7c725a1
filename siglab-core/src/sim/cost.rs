//! Cost model — fees, slippage, and funding for simulated fills.
//!
//! Injected as a trait so live paper-trading and backtests can share the
//! simulator while swapping cost assumptions. Entry slippage is directional
//! and embedded in the fill price; exit slippage is charged as an explicit
//! cost because ladder exits execute at their fixed TP/SL prices.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::Side;
use crate::risk::config::FeeSchedule;

const BPS_DENOMINATOR: Decimal = dec!(10000);

/// Execution friction applied by the simulator.
pub trait CostModel: Send + Sync {
    /// Entry fill price with slippage applied in the adverse direction:
    /// longs pay up, shorts sell down.
    fn entry_fill_price(&self, side: Side, price: Decimal) -> Decimal;

    /// Fee on the entry notional (maker tier).
    fn entry_fee(&self, notional: Decimal) -> Decimal;

    /// Fee on an exited notional (taker tier).
    fn exit_fee(&self, notional: Decimal) -> Decimal;

    /// Slippage cost charged on an exited notional.
    fn exit_slippage(&self, notional: Decimal) -> Decimal;

    /// Funding accrued on an exposure held for `hours_held` hours.
    fn funding_fee(&self, exposure: Decimal, hours_held: Decimal) -> Decimal;
}

/// Flat bps-based cost model built from the configured fee schedule.
#[derive(Debug, Clone)]
pub struct FlatCostModel {
    fees: FeeSchedule,
}

impl FlatCostModel {
    pub fn new(fees: FeeSchedule) -> Self {
        Self { fees }
    }
}

impl CostModel for FlatCostModel {
    fn entry_fill_price(&self, side: Side, price: Decimal) -> Decimal {
        let slip = self.fees.slippage_bps / BPS_DENOMINATOR;
        match side {
            Side::Long => price * (Decimal::ONE + slip),
            Side::Short => price * (Decimal::ONE - slip),
        }
    }

    fn entry_fee(&self, notional: Decimal) -> Decimal {
        notional * self.fees.maker_bps / BPS_DENOMINATOR
    }

    fn exit_fee(&self, notional: Decimal) -> Decimal {
        notional * self.fees.taker_bps / BPS_DENOMINATOR
    }

    fn exit_slippage(&self, notional: Decimal) -> Decimal {
        notional * self.fees.slippage_bps / BPS_DENOMINATOR
    }

    fn funding_fee(&self, exposure: Decimal, hours_held: Decimal) -> Decimal {
        exposure * self.fees.hourly_funding_rate * hours_held
    }
}

/// Zero-cost model for isolating lifecycle logic in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frictionless;

impl CostModel for Frictionless {
    fn entry_fill_price(&self, _side: Side, price: Decimal) -> Decimal {
        price
    }

    fn entry_fee(&self, _notional: Decimal) -> Decimal {
        Decimal::ZERO
    }

    fn exit_fee(&self, _notional: Decimal) -> Decimal {
        Decimal::ZERO
    }

    fn exit_slippage(&self, _notional: Decimal) -> Decimal {
        Decimal::ZERO
    }

    fn funding_fee(&self, _exposure: Decimal, _hours_held: Decimal) -> Decimal {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> FlatCostModel {
        FlatCostModel::new(FeeSchedule {
            maker_bps: dec!(2),
            taker_bps: dec!(5),
            slippage_bps: dec!(10),
            hourly_funding_rate: dec!(0.0000125),
        })
    }

    #[test]
    fn long_entry_pays_up() {
        let price = flat().entry_fill_price(Side::Long, dec!(100));
        assert_eq!(price, dec!(100.10));
    }

    #[test]
    fn short_entry_sells_down() {
        let price = flat().entry_fill_price(Side::Short, dec!(100));
        assert_eq!(price, dec!(99.90));
    }

    #[test]
    fn fee_tiers() {
        let model = flat();
        assert_eq!(model.entry_fee(dec!(10000)), dec!(2));
        assert_eq!(model.exit_fee(dec!(10000)), dec!(5));
        assert_eq!(model.exit_slippage(dec!(10000)), dec!(10));
    }

    #[test]
    fn funding_scales_with_exposure_and_hours() {
        let fee = flat().funding_fee(dec!(1000), dec!(8));
        assert_eq!(fee, dec!(0.1));
    }

    #[test]
    fn frictionless_is_free() {
        let model = Frictionless;
        assert_eq!(model.entry_fill_price(Side::Long, dec!(100)), dec!(100));
        assert_eq!(model.exit_fee(dec!(10000)), Decimal::ZERO);
        assert_eq!(model.funding_fee(dec!(1000), dec!(8)), Decimal::ZERO);
    }
}
