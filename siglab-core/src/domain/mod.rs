//! Domain types for the signal lifecycle engine.

pub mod bar;
pub mod portfolio;
pub mod signal;
pub mod trade;

pub use bar::Bar;
pub use portfolio::{PortfolioSnapshot, CORRELATED_BUCKET};
pub use signal::{Side, Signal, SignalError, TpLadder, TpLevel};
pub use trade::{EntryFill, Exit, ExitKind, Trade, TradeStatus};
