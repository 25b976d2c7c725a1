//! Walk-forward validation — purged train/test window splitting and OOS
//! evaluation.
//!
//! Splits a data range into train/test window pairs separated by a purge
//! period (drops samples whose outcome horizon overlaps the boundary) plus
//! an embargo period (extra dead time so serially-correlated features cannot
//! leak). Folds are evaluated out-of-sample in parallel; a data range too
//! short for even one split is a routine outcome and yields an empty list.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use siglab_core::domain::{Bar, Signal};
use siglab_core::sim::CostModel;

use crate::backtest::{BacktestOrchestrator, BacktestSummary, RunError};
use crate::config::BacktestConfig;

// ─── Configuration ───────────────────────────────────────────────────

/// How the train window moves from one split to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowMode {
    /// Train start is anchored at the data start; the window grows.
    Expanding,
    /// Train window keeps a fixed length and slides forward.
    Sliding,
}

/// Configuration for walk-forward splitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    pub train_days: i64,
    pub test_days: i64,
    /// Days dropped after the train window so outcomes spanning the boundary
    /// cannot leak into training.
    pub purge_days: i64,
    /// Extra dead days after the purge.
    pub embargo_days: i64,
    pub mode: WindowMode,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_days: 180,
            test_days: 30,
            purge_days: 2,
            embargo_days: 1,
            mode: WindowMode::Sliding,
        }
    }
}

impl WalkForwardConfig {
    fn validate(&self) -> Result<(), WalkForwardError> {
        if self.train_days <= 0 || self.test_days <= 0 {
            return Err(WalkForwardError::NonPositiveWindow {
                train_days: self.train_days,
                test_days: self.test_days,
            });
        }
        if self.purge_days < 0 || self.embargo_days < 0 {
            return Err(WalkForwardError::NegativeGap {
                purge_days: self.purge_days,
                embargo_days: self.embargo_days,
            });
        }
        Ok(())
    }
}

// ─── Split types ─────────────────────────────────────────────────────

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// One walk-forward split: four contiguous, disjoint intervals.
///
/// `train.end == purge.start`, `purge.end == embargo.start`, and
/// `embargo.end == test.start`. Training pipelines drop samples whose
/// outcome horizon reaches into `purge` and take no entries before
/// `embargo` ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkForwardSplit {
    pub index: usize,
    pub train: TimeRange,
    pub purge: TimeRange,
    pub embargo: TimeRange,
    pub test: TimeRange,
}

impl WalkForwardSplit {
    /// Required dead time between the last train sample and the first test
    /// sample.
    pub fn gap(&self) -> Duration {
        self.purge.duration() + self.embargo.duration()
    }
}

/// Errors from walk-forward splitting and validation.
#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("train/test windows must be positive: train {train_days}d, test {test_days}d")]
    NonPositiveWindow { train_days: i64, test_days: i64 },
    #[error("purge/embargo must be non-negative: purge {purge_days}d, embargo {embargo_days}d")]
    NegativeGap { purge_days: i64, embargo_days: i64 },
    #[error(
        "leakage in split {index}: gap between last train sample and first test sample \
         is {actual_gap_hours}h, required {required_gap_hours}h"
    )]
    Leakage {
        index: usize,
        actual_gap_hours: i64,
        required_gap_hours: i64,
    },
    #[error("fold {index} failed: {source}")]
    FoldFailed {
        index: usize,
        #[source]
        source: RunError,
    },
}

// ─── Split generation ────────────────────────────────────────────────

/// Generate train/test splits covering `[data_start, data_end)`.
///
/// Splits advance by one test-window length. Generation stops at the first
/// split whose test window would run past `data_end`; a range too short for
/// any split yields an empty vec, not an error.
pub fn generate_splits(
    config: &WalkForwardConfig,
    data_start: DateTime<Utc>,
    data_end: DateTime<Utc>,
) -> Result<Vec<WalkForwardSplit>, WalkForwardError> {
    config.validate()?;

    let train = Duration::days(config.train_days);
    let test = Duration::days(config.test_days);
    let purge = Duration::days(config.purge_days);
    let embargo = Duration::days(config.embargo_days);

    let mut splits = Vec::new();
    for index in 0.. {
        let offset = test * index as i32;
        let train_start = match config.mode {
            WindowMode::Expanding => data_start,
            WindowMode::Sliding => data_start + offset,
        };
        let train_end = data_start + train + offset;
        let purge_end = train_end + purge;
        let embargo_end = purge_end + embargo;
        let test_end = embargo_end + test;
        if test_end > data_end {
            break;
        }
        splits.push(WalkForwardSplit {
            index: index as usize,
            train: TimeRange::new(train_start, train_end),
            purge: TimeRange::new(train_end, purge_end),
            embargo: TimeRange::new(purge_end, embargo_end),
            test: TimeRange::new(embargo_end, test_end),
        });
    }

    info!(splits = splits.len(), mode = ?config.mode, "generated walk-forward splits");
    Ok(splits)
}

/// Verify against actual sample timestamps that every split keeps its full
/// purge + embargo gap between the last train sample and the first test
/// sample. Guards hand-built or deserialized splits.
pub fn validate_no_leakage(
    splits: &[WalkForwardSplit],
    timestamps: &[DateTime<Utc>],
) -> Result<(), WalkForwardError> {
    for split in splits {
        let required = split.gap();
        let last_train = timestamps
            .iter()
            .filter(|t| split.train.contains(**t))
            .max();
        let first_test = timestamps
            .iter()
            .filter(|t| split.test.contains(**t))
            .min();
        if let (Some(last), Some(first)) = (last_train, first_test) {
            let actual = *first - *last;
            if actual < required {
                return Err(WalkForwardError::Leakage {
                    index: split.index,
                    actual_gap_hours: actual.num_hours(),
                    required_gap_hours: required.num_hours(),
                });
            }
        }
    }
    Ok(())
}

// ─── OOS evaluation ──────────────────────────────────────────────────

/// Out-of-sample result for one split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldOutcome {
    pub split: WalkForwardSplit,
    pub summary: BacktestSummary,
}

/// Aggregated walk-forward evaluation across all splits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub folds: Vec<FoldOutcome>,
    pub mean_oos_sharpe: f64,
    pub mean_oos_return_pct: f64,
    pub total_oos_trades: usize,
}

impl WalkForwardReport {
    fn from_folds(folds: Vec<FoldOutcome>) -> Self {
        let n = folds.len() as f64;
        let (mut sharpe_sum, mut return_sum, mut trades) = (0.0, 0.0, 0usize);
        for fold in &folds {
            sharpe_sum += fold.summary.stats.sharpe;
            return_sum += fold.summary.stats.total_return_pct;
            trades += fold.summary.stats.trade_count;
        }
        let (mean_oos_sharpe, mean_oos_return_pct) = if folds.is_empty() {
            (0.0, 0.0)
        } else {
            (sharpe_sum / n, return_sum / n)
        };
        Self {
            folds,
            mean_oos_sharpe,
            mean_oos_return_pct,
            total_oos_trades: trades,
        }
    }
}

/// Evaluate every split out-of-sample, in parallel.
///
/// Each fold backtests only the signals and bars inside its test window, so
/// trades cannot run past the fold boundary. Folds are independent; rayon
/// fans them out across the thread pool.
pub fn evaluate_folds(
    config: &BacktestConfig,
    splits: &[WalkForwardSplit],
    signals: &[Signal],
    bars_by_symbol: &HashMap<String, Vec<Bar>>,
    costs: &dyn CostModel,
) -> Result<WalkForwardReport, WalkForwardError> {
    let folds: Vec<FoldOutcome> = splits
        .par_iter()
        .map(|split| {
            let fold_signals: Vec<Signal> = signals
                .iter()
                .filter(|s| split.test.contains(s.timestamp))
                .cloned()
                .collect();
            let fold_bars: HashMap<String, Vec<Bar>> = bars_by_symbol
                .iter()
                .map(|(symbol, bars)| {
                    let clipped: Vec<Bar> = bars
                        .iter()
                        .filter(|b| split.test.contains(b.timestamp))
                        .cloned()
                        .collect();
                    (symbol.clone(), clipped)
                })
                .collect();

            let orchestrator = BacktestOrchestrator::new(config.clone()).map_err(|e| {
                WalkForwardError::FoldFailed {
                    index: split.index,
                    source: e.into(),
                }
            })?;
            let summary = orchestrator
                .run(&fold_signals, &fold_bars, costs, None)
                .map_err(|e| WalkForwardError::FoldFailed {
                    index: split.index,
                    source: e,
                })?;
            Ok(FoldOutcome {
                split: *split,
                summary,
            })
        })
        .collect::<Result<Vec<_>, WalkForwardError>>()?;

    Ok(WalkForwardReport::from_folds(folds))
}
