//! Risk layer — configuration, tiered risk profiles, and position sizing.
//!
//! Sizing is a pure function of (signal, tier, capital, portfolio snapshot):
//! no globals, no environment reads. All limits come from [`RiskConfig`] and
//! the [`ProfileRegistry`], both constructed explicitly by the caller.

pub mod config;
pub mod profile;
pub mod sizer;

pub use config::{ConfigError, ExchangeLimits, FeeSchedule, RiskConfig, TrailingParams};
pub use profile::{ProfileRegistry, RiskProfile, RiskTier};
pub use sizer::{PositionSizer, SizingOutcome, SizingRejection, SizingResult};
