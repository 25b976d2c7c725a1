//! SigLab Core — domain types, risk sizing, and trade simulation.
//!
//! This crate contains the deterministic heart of the signal-lifecycle engine:
//! - Domain types (bars, signals, portfolio snapshots, trades)
//! - Tiered risk profiles and the risk-constrained position sizer
//! - Pluggable cost models (fees, slippage, funding)
//! - Bar-by-bar trade simulator with TP ladder, trailing stop, and time stop
//!
//! Everything here is pure and single-threaded; orchestration, capital
//! accounting, and walk-forward splitting live in the runner crate.

pub mod domain;
pub mod risk;
pub mod sim;
