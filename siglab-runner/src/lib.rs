//! SigLab Runner — backtest orchestration, metrics, and walk-forward
//! validation.
//!
//! This crate builds on `siglab-core` to provide:
//! - Sequential signal replay against a single capital account
//! - Performance statistics (returns, drawdown, Sharpe, ladder hit rates)
//! - Purged/embargoed walk-forward splitting with parallel OOS evaluation
//! - Run fingerprinting for reproducible result identification

pub mod backtest;
pub mod config;
pub mod metrics;
pub mod walk_forward;

pub use backtest::{BacktestOrchestrator, BacktestSummary, EquityPoint, RunError};
pub use config::{BacktestConfig, RunId};
pub use metrics::PerformanceStats;
pub use walk_forward::{
    evaluate_folds, generate_splits, validate_no_leakage, FoldOutcome, TimeRange,
    WalkForwardConfig, WalkForwardError, WalkForwardReport, WalkForwardSplit, WindowMode,
};
