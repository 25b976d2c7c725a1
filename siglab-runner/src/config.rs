//! Serializable backtest configuration and run fingerprinting.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use siglab_core::risk::{RiskConfig, RiskTier};

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Everything needed to reproduce a backtest run.
///
/// Two runs with identical configs produce the same [`RunId`], so results
/// keyed by it are safely reusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Starting capital in quote currency.
    pub initial_capital: Decimal,
    /// Risk tier applied to every signal in the run.
    pub tier: RiskTier,
    /// Exchange limits, fees, trailing, and holding horizon.
    pub risk: RiskConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(10000),
            tier: RiskTier::Medium,
            risk: RiskConfig::default(),
        }
    }
}

impl BacktestConfig {
    /// Deterministic content hash of this configuration.
    pub fn run_id(&self) -> RunId {
        // Struct field order is fixed, so the JSON is deterministic.
        let json = serde_json::to_string(self).expect("BacktestConfig must serialize");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_is_deterministic() {
        let a = BacktestConfig::default();
        let b = BacktestConfig::default();
        assert_eq!(a.run_id(), b.run_id());
    }

    #[test]
    fn run_id_changes_with_config() {
        let a = BacktestConfig::default();
        let b = BacktestConfig {
            tier: RiskTier::High,
            ..Default::default()
        };
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = BacktestConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: BacktestConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
