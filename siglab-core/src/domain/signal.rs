//! Signal — an externally produced trade instruction with entry, stop and
//! take-profit ladder.
//!
//! Signals are read-only to this crate. Validation is fail-fast: a malformed
//! signal (inverted TP ladder, weights that do not sum to 100) is a caller
//! bug, not a market condition, and is rejected before any sizing or
//! simulation begins.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Signed unit: +1 for long, -1 for short. Used to mirror price math.
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Long => Decimal::ONE,
            Side::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// One rung of the take-profit ladder: a target price and the percentage of
/// the original position to exit when the price is touched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TpLevel {
    pub price: Decimal,
    /// Percentage of the original quantity to exit at this level (0..=100).
    pub exit_pct: Decimal,
}

/// Three-rung take-profit ladder. Weights must sum to exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TpLadder {
    pub tp1: TpLevel,
    pub tp2: TpLevel,
    pub tp3: TpLevel,
}

impl TpLadder {
    pub fn levels(&self) -> [TpLevel; 3] {
        [self.tp1, self.tp2, self.tp3]
    }

    pub fn weight_sum(&self) -> Decimal {
        self.tp1.exit_pct + self.tp2.exit_pct + self.tp3.exit_pct
    }
}

/// A trading signal as produced by the inference layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub timestamp: DateTime<Utc>,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub targets: TpLadder,
    /// Model confidence in [0, 1].
    pub confidence: f64,
    /// Average true range at signal time, used for trailing-stop distance.
    pub atr: Option<Decimal>,
    /// Caller-requested leverage; capped by profile and exchange limits.
    pub requested_leverage: Option<u32>,
}

/// Contract violations in a signal. Fatal before simulation starts.
#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("entry price must be positive, got {0}")]
    NonPositiveEntry(Decimal),
    #[error("stop loss {stop} is not on the loss side of entry {entry} for {side}")]
    StopOnWrongSide {
        side: Side,
        entry: Decimal,
        stop: Decimal,
    },
    #[error("take-profit ladder is not monotone on the profit side of entry {entry} for {side}")]
    TpNotMonotone { side: Side, entry: Decimal },
    #[error("take-profit weights sum to {0}, expected 100")]
    TpWeightsNot100(Decimal),
    #[error("confidence {0} outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

impl Signal {
    /// Validate the internal consistency of the signal.
    ///
    /// For longs the stop must be strictly below entry and the TP ladder
    /// strictly ascending above entry; mirrored for shorts.
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.entry_price <= Decimal::ZERO {
            return Err(SignalError::NonPositiveEntry(self.entry_price));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(SignalError::ConfidenceOutOfRange(self.confidence));
        }

        let wrong_stop = match self.side {
            Side::Long => self.stop_loss >= self.entry_price,
            Side::Short => self.stop_loss <= self.entry_price,
        };
        if wrong_stop {
            return Err(SignalError::StopOnWrongSide {
                side: self.side,
                entry: self.entry_price,
                stop: self.stop_loss,
            });
        }

        let [tp1, tp2, tp3] = self.targets.levels();
        let monotone = match self.side {
            Side::Long => {
                self.entry_price < tp1.price && tp1.price < tp2.price && tp2.price < tp3.price
            }
            Side::Short => {
                self.entry_price > tp1.price && tp1.price > tp2.price && tp2.price > tp3.price
            }
        };
        if !monotone {
            return Err(SignalError::TpNotMonotone {
                side: self.side,
                entry: self.entry_price,
            });
        }

        let sum = self.targets.weight_sum();
        if (sum - dec!(100)).abs() > dec!(0.000001) {
            return Err(SignalError::TpWeightsNot100(sum));
        }

        Ok(())
    }

    /// Distance between entry and stop, always positive for a valid signal.
    pub fn stop_distance(&self) -> Decimal {
        (self.entry_price - self.stop_loss).abs()
    }
}
