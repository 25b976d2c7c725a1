//! Trade — a completed round trip through the signal lifecycle.
//!
//! Created once per simulated signal and immutable after finalize.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::signal::Side;

/// Why a portion of the position was exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitKind {
    Tp1,
    Tp2,
    Tp3,
    StopLoss,
    Time,
    EndOfData,
    Forced,
}

impl std::fmt::Display for ExitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitKind::Tp1 => write!(f, "TP1"),
            ExitKind::Tp2 => write!(f, "TP2"),
            ExitKind::Tp3 => write!(f, "TP3"),
            ExitKind::StopLoss => write!(f, "SL"),
            ExitKind::Time => write!(f, "TIME"),
            ExitKind::EndOfData => write!(f, "END"),
            ExitKind::Forced => write!(f, "FORCED"),
        }
    }
}

/// Terminal (or in-flight) lifecycle state of a simulated position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Open,
    /// Stop-loss (initial or trailing) closed the remaining quantity.
    ClosedStop,
    /// All three take-profit rungs filled.
    ClosedTpFull,
    /// Maximum holding horizon exceeded.
    ClosedTime,
    /// Forward bars exhausted with quantity remaining.
    ClosedEnd,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TradeStatus::Open)
    }
}

/// One partial or full exit fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exit {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub quantity: Decimal,
    /// Percentage of the original position quantity this exit represents.
    pub pct_of_original: Decimal,
    pub kind: ExitKind,
    pub fee: Decimal,
    pub slippage_cost: Decimal,
}

/// The entry fill of a trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryFill {
    pub timestamp: DateTime<Utc>,
    /// Fill price after adverse slippage.
    pub price: Decimal,
    pub fee: Decimal,
}

/// A finalized round-trip trade with costs applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub signal_id: String,
    pub symbol: String,
    pub side: Side,
    pub entry: EntryFill,
    pub quantity: Decimal,
    /// Notional position size in quote currency at entry.
    pub position_size_usd: Decimal,
    pub leverage: u32,
    pub exits: Vec<Exit>,
    pub gross_pnl: Decimal,
    pub total_fees: Decimal,
    pub total_slippage: Decimal,
    pub funding_fees: Decimal,
    pub net_pnl: Decimal,
    /// Net PnL as a percentage of position size.
    pub net_pnl_pct: Decimal,
    pub status: TradeStatus,
}

impl Trade {
    /// Wall-clock holding duration from entry to last exit.
    pub fn duration(&self) -> Duration {
        match self.exits.last() {
            Some(exit) => exit.timestamp - self.entry.timestamp,
            None => Duration::zero(),
        }
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl > Decimal::ZERO
    }

    /// Whether any exit of the given kind fired.
    pub fn hit(&self, kind: ExitKind) -> bool {
        self.exits.iter().any(|e| e.kind == kind)
    }
}
