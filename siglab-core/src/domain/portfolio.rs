//! PortfolioSnapshot — the caller-owned view of currently open exposure.
//!
//! The core only reads this. Live callers must serialize snapshot-read →
//! sizing decision → exposure-commit as one critical section per portfolio;
//! two concurrent sizing calls against a stale snapshot can jointly overshoot
//! the global cap.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Symbols whose prices move together closely enough that their exposure is
/// capped as one bucket.
pub const CORRELATED_BUCKET: [&str; 2] = ["BTCUSDT", "ETHUSDT"];

/// Open exposure at the time of a sizing call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Number of currently open positions.
    pub open_positions: usize,
    /// Exposure in quote currency, per symbol.
    pub exposure_by_symbol: HashMap<String, Decimal>,
    /// Total exposure in quote currency across all symbols.
    pub total_exposure: Decimal,
}

impl PortfolioSnapshot {
    /// An empty portfolio: no positions, no exposure.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Current exposure for one symbol (zero if not held).
    pub fn symbol_exposure(&self, symbol: &str) -> Decimal {
        self.exposure_by_symbol
            .get(symbol)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Combined exposure across the BTC/ETH correlated bucket.
    pub fn correlated_exposure(&self) -> Decimal {
        CORRELATED_BUCKET
            .iter()
            .map(|s| self.symbol_exposure(s))
            .sum()
    }

    /// Whether a symbol counts against the correlated-bucket cap.
    pub fn is_correlated(symbol: &str) -> bool {
        CORRELATED_BUCKET.contains(&symbol)
    }
}
