//! Backtest orchestrator — replays a signal stream against historical bars.
//!
//! Signals are replayed strictly in timestamp order against a single capital
//! account: size with the capital available at that moment, simulate the
//! trade to completion, settle PnL, move on. Sizing rejections and missing
//! market data are routine outcomes tallied on the summary, never errors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use siglab_core::domain::{Bar, PortfolioSnapshot, Signal, SignalError, Trade};
use siglab_core::risk::{ConfigError, PositionSizer, ProfileRegistry, SizingOutcome};
use siglab_core::sim::{CostModel, SimulationError, TradeSimulator};

use crate::config::{BacktestConfig, RunId};
use crate::metrics::PerformanceStats;

/// Errors from the orchestrator.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("malformed signal: {0}")]
    Signal(#[from] SignalError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

/// One point on the equity curve, recorded after each trade settles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
}

/// Complete result of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub run_id: RunId,
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub peak_capital: Decimal,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub stats: PerformanceStats,
    /// Sizing rejections tallied by reason code.
    pub rejections: HashMap<String, usize>,
    /// Signals with no forward bars for their symbol.
    pub skipped_no_data: usize,
    /// Signals sized beyond the capital remaining at that point.
    pub skipped_capacity: usize,
    /// True when the run stopped early on the cancellation flag; the summary
    /// then covers only the signals processed so far.
    pub cancelled: bool,
}

/// Replays a signal stream sequentially against one capital account.
#[derive(Debug)]
pub struct BacktestOrchestrator {
    config: BacktestConfig,
    sizer: PositionSizer,
    simulator: TradeSimulator,
}

impl BacktestOrchestrator {
    /// Validates the risk configuration and profile registry up front;
    /// a bad config stops the run before any signal is touched.
    pub fn new(config: BacktestConfig) -> Result<Self, ConfigError> {
        config.risk.validate()?;
        let profiles = ProfileRegistry::standard();
        profiles.validate()?;
        let sizer = PositionSizer::new(config.risk.clone(), profiles);
        let simulator = TradeSimulator::new(config.risk.clone());
        Ok(Self {
            config,
            sizer,
            simulator,
        })
    }

    /// Run the backtest.
    ///
    /// `cancel` is checked between signals; when it fires, the summary is
    /// returned with `cancelled = true` and covers the work done so far.
    pub fn run(
        &self,
        signals: &[Signal],
        bars_by_symbol: &HashMap<String, Vec<Bar>>,
        costs: &dyn CostModel,
        cancel: Option<&AtomicBool>,
    ) -> Result<BacktestSummary, RunError> {
        let mut ordered: Vec<&Signal> = signals.iter().collect();
        // Stable: signals sharing a timestamp keep their input order.
        ordered.sort_by_key(|s| s.timestamp);

        let mut capital = self.config.initial_capital;
        let mut peak = capital;
        let mut trades: Vec<Trade> = Vec::new();
        let mut equity_curve: Vec<EquityPoint> = Vec::new();
        let mut rejections: HashMap<String, usize> = HashMap::new();
        let mut skipped_no_data = 0usize;
        let mut skipped_capacity = 0usize;
        let mut cancelled = false;

        for signal in ordered {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                info!(processed = trades.len(), "cancellation requested, stopping run");
                cancelled = true;
                break;
            }

            let forward = forward_bars(bars_by_symbol, &signal.symbol, signal.timestamp);
            if forward.is_empty() {
                debug!(signal_id = %signal.id, symbol = %signal.symbol, "no forward bars, skipping");
                skipped_no_data += 1;
                continue;
            }

            // Sequential replay: one position at a time, so the sizer sees an
            // empty book and the parallel/correlation caps never bind here.
            let outcome =
                self.sizer
                    .size(signal, self.config.tier, capital, &PortfolioSnapshot::empty())?;
            let sizing = match outcome {
                SizingOutcome::Sized(sizing) => sizing,
                SizingOutcome::Rejected(rejection) => {
                    debug!(signal_id = %signal.id, reason = rejection.reason_code(), "signal rejected");
                    *rejections.entry(rejection.reason_code().to_string()).or_insert(0) += 1;
                    continue;
                }
            };

            if sizing.margin_usd > capital {
                debug!(signal_id = %signal.id, margin = %sizing.margin_usd, capital = %capital, "insufficient capital");
                skipped_capacity += 1;
                continue;
            }

            let trade = match self.simulator.simulate(signal, &sizing, forward, costs) {
                Ok(trade) => trade,
                Err(SimulationError::NoMarketData { .. }) => {
                    skipped_no_data += 1;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            capital += trade.net_pnl;
            peak = peak.max(capital);
            if let Some(last_exit) = trade.exits.last() {
                equity_curve.push(EquityPoint {
                    timestamp: last_exit.timestamp,
                    equity: capital,
                });
            }
            trades.push(trade);
        }

        let mut curve_values = Vec::with_capacity(equity_curve.len() + 1);
        curve_values.push(self.config.initial_capital);
        curve_values.extend(equity_curve.iter().map(|p| p.equity));
        let stats = PerformanceStats::compute(&curve_values, &trades);

        info!(
            trades = trades.len(),
            final_capital = %capital,
            cancelled,
            "backtest complete"
        );

        Ok(BacktestSummary {
            run_id: self.config.run_id(),
            initial_capital: self.config.initial_capital,
            final_capital: capital,
            peak_capital: peak,
            trades,
            equity_curve,
            stats,
            rejections,
            skipped_no_data,
            skipped_capacity,
            cancelled,
        })
    }
}

/// Bars strictly after the signal timestamp; the first one carries the
/// entry fill.
fn forward_bars<'a>(
    bars_by_symbol: &'a HashMap<String, Vec<Bar>>,
    symbol: &str,
    after: DateTime<Utc>,
) -> &'a [Bar] {
    match bars_by_symbol.get(symbol) {
        Some(bars) => {
            let start = bars.partition_point(|bar| bar.timestamp <= after);
            &bars[start..]
        }
        None => &[],
    }
}
