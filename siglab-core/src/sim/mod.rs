//! Trade simulation — cost models and the bar-by-bar lifecycle replay.

pub mod cost;
pub mod simulator;

pub use cost::{CostModel, FlatCostModel, Frictionless};
pub use simulator::{SimulationError, TradeSimulator};
