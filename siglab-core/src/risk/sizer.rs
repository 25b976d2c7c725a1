//! Position sizing — risk-constrained quantity, leverage, and liquidation
//! estimate for one signal.
//!
//! `size` is a pure function of its inputs: it never mutates the portfolio
//! snapshot. The caller commits the new exposure only once the position is
//! actually opened, inside the same critical section as the snapshot read.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{PortfolioSnapshot, Side, Signal, SignalError};

use super::config::RiskConfig;
use super::profile::{ProfileRegistry, RiskTier};

/// A fully sized position, ready for simulation or live submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingResult {
    /// Quantity in base units, floored to the exchange lot step.
    pub quantity: Decimal,
    pub leverage: u32,
    /// Notional exposure in quote currency (quantity x entry).
    pub exposure_usd: Decimal,
    /// Margin reserved for the position (exposure / leverage).
    pub margin_usd: Decimal,
    /// Estimated forced-liquidation price.
    pub liquidation_price: Decimal,
}

/// Enumerated, recoverable sizing rejections. Routine outcomes in a live
/// pipeline, never raised as errors; each variant carries the computed
/// values and the threshold that tripped.
#[derive(Debug, Clone, Copy, PartialEq, Error, Serialize, Deserialize)]
pub enum SizingRejection {
    #[error("too many parallel positions: {open} open >= max {max}")]
    TooManyParallelPositions { open: usize, max: usize },
    #[error("global exposure cap: {existing} existing + {new} new > cap {cap}")]
    GlobalExposureCap {
        existing: Decimal,
        new: Decimal,
        cap: Decimal,
    },
    #[error("BTC+ETH correlation cap: {existing} existing + {new} new > cap {cap}")]
    BtcEthCorrCap {
        existing: Decimal,
        new: Decimal,
        cap: Decimal,
    },
    #[error("exposure {exposure} below exchange min notional {min_notional}")]
    BelowMinNotional {
        exposure: Decimal,
        min_notional: Decimal,
    },
    #[error("liquidation {liquidation} not strictly beyond stop {stop}")]
    LiqTooCloseToStop { liquidation: Decimal, stop: Decimal },
}

impl SizingRejection {
    /// Stable snake_case code for logs and persistence rows.
    pub fn reason_code(&self) -> &'static str {
        match self {
            SizingRejection::TooManyParallelPositions { .. } => "too_many_parallel_positions",
            SizingRejection::GlobalExposureCap { .. } => "global_exposure_cap",
            SizingRejection::BtcEthCorrCap { .. } => "btc_eth_corr_cap",
            SizingRejection::BelowMinNotional { .. } => "below_min_notional",
            SizingRejection::LiqTooCloseToStop { .. } => "liq_too_close_to_sl",
        }
    }
}

/// Accepted-or-rejected outcome of a sizing call. A rejection always implies
/// zero quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SizingOutcome {
    Sized(SizingResult),
    Rejected(SizingRejection),
}

impl SizingOutcome {
    pub fn sized(&self) -> Option<&SizingResult> {
        match self {
            SizingOutcome::Sized(result) => Some(result),
            SizingOutcome::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&SizingRejection> {
        match self {
            SizingOutcome::Sized(_) => None,
            SizingOutcome::Rejected(rejection) => Some(rejection),
        }
    }
}

/// Risk-constrained position sizer.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    config: RiskConfig,
    profiles: ProfileRegistry,
}

impl PositionSizer {
    pub fn new(config: RiskConfig, profiles: ProfileRegistry) -> Self {
        Self { config, profiles }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    /// Size one signal against the given capital and exposure snapshot.
    ///
    /// Returns `Err` only for a malformed signal (caller bug, fail fast);
    /// every market-condition outcome is a `SizingOutcome`.
    pub fn size(
        &self,
        signal: &Signal,
        tier: RiskTier,
        capital_usd: Decimal,
        snapshot: &PortfolioSnapshot,
    ) -> Result<SizingOutcome, SignalError> {
        signal.validate()?;

        let profile = self.profiles.get(tier);

        // Leverage: the lowest of requested, tier ceiling, exchange ceiling.
        let leverage = signal
            .requested_leverage
            .unwrap_or(profile.max_leverage)
            .min(profile.max_leverage)
            .min(self.config.exchange.max_leverage)
            .max(1);

        if snapshot.open_positions >= profile.max_parallel_positions {
            return Ok(SizingOutcome::Rejected(
                SizingRejection::TooManyParallelPositions {
                    open: snapshot.open_positions,
                    max: profile.max_parallel_positions,
                },
            ));
        }

        // Risk budget to quantity: risk_usd absorbs the stop distance, then
        // leverage scales the notional.
        let risk_usd = capital_usd * profile.risk_per_trade;
        let raw_quantity =
            risk_usd / signal.stop_distance() * Decimal::from(leverage) / signal.entry_price;
        let mut quantity = floor_to_step(raw_quantity, self.config.exchange.lot_step);
        let mut exposure = quantity * signal.entry_price;

        // Per-symbol cap clamps rather than rejects: a reduced position is valid.
        let symbol_cap = profile.cap_per_symbol * capital_usd;
        let headroom = symbol_cap - snapshot.symbol_exposure(&signal.symbol);
        if exposure > headroom {
            let capped_quantity = if headroom > Decimal::ZERO {
                floor_to_step(headroom / signal.entry_price, self.config.exchange.lot_step)
            } else {
                Decimal::ZERO
            };
            debug!(
                signal_id = %signal.id,
                symbol = %signal.symbol,
                %exposure,
                cap = %symbol_cap,
                "per-symbol cap clamps position"
            );
            quantity = capped_quantity;
            exposure = quantity * signal.entry_price;
        }

        let global_cap = profile.cap_global * capital_usd;
        if snapshot.total_exposure + exposure > global_cap {
            return Ok(SizingOutcome::Rejected(SizingRejection::GlobalExposureCap {
                existing: snapshot.total_exposure,
                new: exposure,
                cap: global_cap,
            }));
        }

        if PortfolioSnapshot::is_correlated(&signal.symbol) {
            let corr_cap = self.config.btc_eth_corr_cap * capital_usd;
            let existing = snapshot.correlated_exposure();
            if existing + exposure > corr_cap {
                return Ok(SizingOutcome::Rejected(SizingRejection::BtcEthCorrCap {
                    existing,
                    new: exposure,
                    cap: corr_cap,
                }));
            }
        }

        if exposure < self.config.exchange.min_notional {
            return Ok(SizingOutcome::Rejected(SizingRejection::BelowMinNotional {
                exposure,
                min_notional: self.config.exchange.min_notional,
            }));
        }

        let liquidation_price = estimate_liquidation(
            signal.side,
            signal.entry_price,
            leverage,
            self.config.exchange.maintenance_margin,
        );

        // The stop must trigger before forced liquidation ever could.
        let liq_beyond_stop = match signal.side {
            Side::Long => liquidation_price < signal.stop_loss,
            Side::Short => liquidation_price > signal.stop_loss,
        };
        if !liq_beyond_stop {
            return Ok(SizingOutcome::Rejected(SizingRejection::LiqTooCloseToStop {
                liquidation: liquidation_price,
                stop: signal.stop_loss,
            }));
        }

        Ok(SizingOutcome::Sized(SizingResult {
            quantity,
            leverage,
            exposure_usd: exposure,
            margin_usd: exposure / Decimal::from(leverage),
            liquidation_price,
        }))
    }
}

/// Floor a quantity down to a multiple of the exchange lot step.
pub fn floor_to_step(quantity: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return quantity;
    }
    (quantity / step).floor() * step
}

/// Estimated forced-liquidation price for an isolated-margin position.
///
/// Long: `entry * (1 - 1/leverage - maintenance_margin)`; mirrored for short.
pub fn estimate_liquidation(
    side: Side,
    entry: Decimal,
    leverage: u32,
    maintenance_margin: Decimal,
) -> Decimal {
    let inverse_leverage = Decimal::ONE / Decimal::from(leverage.max(1));
    match side {
        Side::Long => entry * (Decimal::ONE - inverse_leverage - maintenance_margin),
        Side::Short => entry * (Decimal::ONE + inverse_leverage + maintenance_margin),
    }
}
