//! Risk tiers and their numeric profiles.
//!
//! Tiers are a closed enum so an unknown tier is unrepresentable; the old
//! string-typed "LOW"/"MED"/"HIGH" codes only exist at the serde boundary.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::config::ConfigError;

/// Named risk tier selected per portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::Low => write!(f, "LOW"),
            RiskTier::Medium => write!(f, "MEDIUM"),
            RiskTier::High => write!(f, "HIGH"),
        }
    }
}

/// Numeric parameters for one risk tier. Immutable once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    /// Fraction of capital risked per trade (distance to stop, pre-leverage).
    pub risk_per_trade: Decimal,
    /// Leverage ceiling for this tier.
    pub max_leverage: u32,
    /// Maximum number of simultaneously open positions.
    pub max_parallel_positions: usize,
    /// Per-symbol exposure cap as a fraction of capital.
    pub cap_per_symbol: Decimal,
    /// Global exposure cap as a fraction of capital.
    pub cap_global: Decimal,
}

impl RiskProfile {
    fn validate(&self, tier: RiskTier) -> Result<(), ConfigError> {
        let fraction_fields = [
            ("risk_per_trade", self.risk_per_trade),
            ("cap_per_symbol", self.cap_per_symbol),
            ("cap_global", self.cap_global),
        ];
        for (name, value) in fraction_fields {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                return Err(ConfigError::FractionOutOfRange {
                    tier,
                    field: name,
                    value,
                });
            }
        }
        if self.max_leverage == 0 {
            return Err(ConfigError::ZeroLeverage { tier });
        }
        if self.max_parallel_positions == 0 {
            return Err(ConfigError::ZeroParallelPositions { tier });
        }
        if self.cap_per_symbol > self.cap_global {
            return Err(ConfigError::SymbolCapExceedsGlobal { tier });
        }
        Ok(())
    }
}

/// Static mapping from tier to profile, loaded once at startup.
///
/// Defaults follow the conventional ladder; individual tiers can be
/// overridden from configuration before validation. Deserialization runs
/// the same validation, so a registry missing a tier cannot be constructed
/// from serialized data either.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ProfileTable")]
pub struct ProfileRegistry {
    profiles: HashMap<RiskTier, RiskProfile>,
}

/// Raw serde shape of [`ProfileRegistry`], validated on the way in.
#[derive(Deserialize)]
struct ProfileTable {
    profiles: HashMap<RiskTier, RiskProfile>,
}

impl TryFrom<ProfileTable> for ProfileRegistry {
    type Error = ConfigError;

    fn try_from(table: ProfileTable) -> Result<Self, ConfigError> {
        let registry = Self {
            profiles: table.profiles,
        };
        registry.validate()?;
        Ok(registry)
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(
            RiskTier::Low,
            RiskProfile {
                risk_per_trade: dec!(0.005),
                max_leverage: 5,
                max_parallel_positions: 2,
                cap_per_symbol: dec!(0.10),
                cap_global: dec!(0.20),
            },
        );
        profiles.insert(
            RiskTier::Medium,
            RiskProfile {
                risk_per_trade: dec!(0.01),
                max_leverage: 10,
                max_parallel_positions: 3,
                cap_per_symbol: dec!(0.15),
                cap_global: dec!(0.40),
            },
        );
        profiles.insert(
            RiskTier::High,
            RiskProfile {
                risk_per_trade: dec!(0.02),
                max_leverage: 20,
                max_parallel_positions: 5,
                cap_per_symbol: dec!(0.25),
                cap_global: dec!(0.60),
            },
        );
        Self { profiles }
    }
}

impl ProfileRegistry {
    /// Registry with the default tier ladder, validated.
    pub fn standard() -> Self {
        let registry = Self::default();
        // Defaults are statically known-good; validate anyway so a bad edit
        // to the table fails loudly in tests.
        debug_assert!(registry.validate().is_ok());
        registry
    }

    /// Replace one tier's profile (before validation at startup).
    pub fn with_override(mut self, tier: RiskTier, profile: RiskProfile) -> Self {
        self.profiles.insert(tier, profile);
        self
    }

    /// Standard ladder with per-tier overrides from TOML, validated.
    ///
    /// ```toml
    /// [tiers.LOW]
    /// risk_per_trade = "0.002"
    /// max_leverage = 3
    /// max_parallel_positions = 1
    /// cap_per_symbol = "0.05"
    /// cap_global = "0.10"
    /// ```
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct Overrides {
            #[serde(default)]
            tiers: HashMap<RiskTier, RiskProfile>,
        }
        let overrides: Overrides = toml::from_str(raw).map_err(ConfigError::Parse)?;
        let mut registry = Self::default();
        registry.profiles.extend(overrides.tiers);
        registry.validate()?;
        Ok(registry)
    }

    /// Look up a tier. Every tier is always present.
    pub fn get(&self, tier: RiskTier) -> &RiskProfile {
        // Every constructor (defaults, overrides, TOML, deserialization)
        // keeps all three tiers present, so the lookup cannot miss.
        &self.profiles[&tier]
    }

    /// Fail-fast validation of every profile. Call once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for tier in [RiskTier::Low, RiskTier::Medium, RiskTier::High] {
            let profile = self
                .profiles
                .get(&tier)
                .ok_or(ConfigError::MissingTier { tier })?;
            profile.validate(tier)?;
        }
        Ok(())
    }
}
