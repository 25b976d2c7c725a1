//! Risk engine configuration — exchange limits, fees, trailing parameters.
//!
//! Everything here is constructed once at process start (defaults or TOML)
//! and passed by reference into sizing and simulation. There is no hidden
//! process-wide mutable state and no environment-variable lookups inside
//! the engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::profile::RiskTier;

/// Exchange-imposed order limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeLimits {
    /// Minimum order notional in quote currency.
    pub min_notional: Decimal,
    /// Quantity step; quantities are floored to a multiple of this.
    pub lot_step: Decimal,
    /// Hard leverage ceiling regardless of tier.
    pub max_leverage: u32,
    /// Maintenance margin rate used in the liquidation estimate.
    pub maintenance_margin: Decimal,
}

impl Default for ExchangeLimits {
    fn default() -> Self {
        Self {
            min_notional: dec!(5),
            lot_step: dec!(0.001),
            max_leverage: 20,
            maintenance_margin: dec!(0.005),
        }
    }
}

/// Trading cost constants, all in basis points except funding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Entry fee tier (resting limit order).
    pub maker_bps: Decimal,
    /// Exit fee tier (stop/TP fills cross the spread).
    pub taker_bps: Decimal,
    /// Adverse price movement applied to every fill.
    pub slippage_bps: Decimal,
    /// Hourly perpetual funding rate as a fraction of exposure.
    pub hourly_funding_rate: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            maker_bps: dec!(2),
            taker_bps: dec!(5),
            slippage_bps: dec!(3),
            // 0.01% / 8h funding, accrued hourly.
            hourly_funding_rate: dec!(0.0000125),
        }
    }
}

/// Trailing-stop parameters, armed once TP1 fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingParams {
    /// Stop trails the close by this many ATRs.
    pub atr_multiple: Decimal,
    /// Breakeven floor above/below entry, in basis points of entry price.
    pub breakeven_buffer_bps: Decimal,
}

impl Default for TrailingParams {
    fn default() -> Self {
        Self {
            atr_multiple: dec!(2),
            breakeven_buffer_bps: dec!(10),
        }
    }
}

/// Complete risk-engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub exchange: ExchangeLimits,
    pub fees: FeeSchedule,
    pub trailing: TrailingParams,
    /// Maximum holding horizon before the time stop force-closes.
    pub max_holding_hours: i64,
    /// Combined BTC+ETH exposure cap as a fraction of capital.
    pub btc_eth_corr_cap: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            exchange: ExchangeLimits::default(),
            fees: FeeSchedule::default(),
            trailing: TrailingParams::default(),
            max_holding_hours: 48,
            btc_eth_corr_cap: dec!(0.30),
        }
    }
}

/// Startup configuration failures. These stop the process, they are never
/// handled per-call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("profile table is missing tier {tier}")]
    MissingTier { tier: RiskTier },
    #[error("{tier} profile: {field} = {value} outside (0, 1]")]
    FractionOutOfRange {
        tier: RiskTier,
        field: &'static str,
        value: Decimal,
    },
    #[error("{tier} profile: max_leverage must be >= 1")]
    ZeroLeverage { tier: RiskTier },
    #[error("{tier} profile: max_parallel_positions must be >= 1")]
    ZeroParallelPositions { tier: RiskTier },
    #[error("{tier} profile: cap_per_symbol exceeds cap_global")]
    SymbolCapExceedsGlobal { tier: RiskTier },
    #[error("risk config: {field} must be positive, got {value}")]
    NonPositive {
        field: &'static str,
        value: Decimal,
    },
    #[error("risk config: max_leverage must be >= 1")]
    ZeroExchangeLeverage,
    #[error("risk config: max_holding_hours must be >= 1, got {0}")]
    NonPositiveHoldingHours(i64),
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl RiskConfig {
    /// Fail-fast validation. Call once at startup, before any sizing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive_fields = [
            ("min_notional", self.exchange.min_notional),
            ("lot_step", self.exchange.lot_step),
            ("maintenance_margin", self.exchange.maintenance_margin),
            ("atr_multiple", self.trailing.atr_multiple),
            ("btc_eth_corr_cap", self.btc_eth_corr_cap),
        ];
        for (field, value) in positive_fields {
            if value <= Decimal::ZERO {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if self.exchange.max_leverage == 0 {
            return Err(ConfigError::ZeroExchangeLeverage);
        }
        if self.max_holding_hours < 1 {
            return Err(ConfigError::NonPositiveHoldingHours(self.max_holding_hours));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: RiskConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(RiskConfig::default().validate().is_ok());
    }

    #[test]
    fn toml_partial_override_keeps_defaults() {
        let raw = r#"
            max_holding_hours = 24

            [exchange]
            min_notional = "10"
            lot_step = "0.01"
            max_leverage = 25
            maintenance_margin = "0.004"
        "#;
        let config = RiskConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.max_holding_hours, 24);
        assert_eq!(config.exchange.min_notional, dec!(10));
        // Untouched sections fall back to defaults.
        assert_eq!(config.fees, FeeSchedule::default());
        assert_eq!(config.trailing, TrailingParams::default());
    }

    #[test]
    fn invalid_toml_rejected() {
        assert!(matches!(
            RiskConfig::from_toml_str("max_holding_hours = \"tomorrow\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn zero_lot_step_rejected() {
        let mut config = RiskConfig::default();
        config.exchange.lot_step = Decimal::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "lot_step",
                ..
            })
        ));
    }

    #[test]
    fn zero_holding_hours_rejected() {
        let config = RiskConfig {
            max_holding_hours: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveHoldingHours(0))
        ));
    }
}
