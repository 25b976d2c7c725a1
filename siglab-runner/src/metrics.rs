//! Performance metrics — pure functions that compute run statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in,
//! scalar out. Money stays in `Decimal` throughout the pipeline; metrics are
//! the boundary where values convert to `f64` for ratio math. Degenerate
//! inputs (no trades, flat equity) always produce 0.0, never NaN.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use siglab_core::domain::{ExitKind, Trade};

/// Aggregate performance statistics for one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub trade_count: usize,
    pub win_rate: f64,
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub sharpe: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub tp1_hit_rate: f64,
    pub tp2_hit_rate: f64,
    pub tp3_hit_rate: f64,
}

impl PerformanceStats {
    /// Compute all statistics from an equity curve and a trade list.
    pub fn compute(equity_curve: &[Decimal], trades: &[Trade]) -> Self {
        Self {
            trade_count: trades.len(),
            win_rate: win_rate(trades),
            total_return_pct: total_return_pct(equity_curve),
            max_drawdown_pct: max_drawdown_pct(equity_curve),
            sharpe: sharpe_ratio(equity_curve),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            profit_factor: profit_factor(trades),
            tp1_hit_rate: hit_rate(trades, ExitKind::Tp1),
            tp2_hit_rate: hit_rate(trades, ExitKind::Tp2),
            tp3_hit_rate: hit_rate(trades, ExitKind::Tp3),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a percentage: (final - initial) / initial * 100.
pub fn total_return_pct(equity_curve: &[Decimal]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let initial = to_f64(equity_curve[0]);
    let final_eq = to_f64(*equity_curve.last().unwrap());
    if initial <= 0.0 {
        return 0.0;
    }
    (final_eq - initial) / initial * 100.0
}

/// Maximum peak-to-trough drawdown as a positive percentage.
///
/// Returns 0.0 for a monotone or empty curve.
pub fn max_drawdown_pct(equity_curve: &[Decimal]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for point in equity_curve {
        let equity = to_f64(*point);
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let drawdown = (peak - equity) / peak * 100.0;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}

/// Annualized Sharpe ratio over equity-curve period returns.
///
/// Consecutive curve points give the return series, so each return is
/// relative to the capital at that point; annualization assumes roughly one
/// settlement per day (sqrt(365), perpetuals trade continuously).
/// Returns 0.0 with fewer than 2 returns or zero variance.
pub fn sharpe_ratio(equity_curve: &[Decimal]) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * (365.0_f64).sqrt()
}

/// Fractional returns between consecutive equity points.
fn period_returns(equity_curve: &[Decimal]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter_map(|pair| {
            let prev = to_f64(pair[0]);
            if prev <= 0.0 {
                return None;
            }
            Some((to_f64(pair[1]) - prev) / prev)
        })
        .collect()
}

/// Fraction of closed trades with positive net PnL.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Mean net PnL of winning trades, in quote currency. 0.0 without winners.
pub fn avg_win(trades: &[Trade]) -> f64 {
    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| to_f64(t.net_pnl))
        .collect();
    if wins.is_empty() {
        return 0.0;
    }
    mean_f64(&wins)
}

/// Mean net PnL of losing trades (a negative number). Break-even trades are
/// neither wins nor losses. 0.0 without losers.
pub fn avg_loss(trades: &[Trade]) -> f64 {
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| t.net_pnl < Decimal::ZERO)
        .map(|t| to_f64(t.net_pnl))
        .collect();
    if losses.is_empty() {
        return 0.0;
    }
    mean_f64(&losses)
}

/// Gross profit / gross loss. 0.0 when there are no losses (undefined).
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.net_pnl > Decimal::ZERO)
        .map(|t| to_f64(t.net_pnl))
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < Decimal::ZERO)
        .map(|t| to_f64(t.net_pnl).abs())
        .sum();
    if gross_loss < 1e-15 {
        return 0.0;
    }
    gross_profit / gross_loss
}

/// Fraction of trades that exited at least once via `kind`.
pub fn hit_rate(trades: &[Trade], kind: ExitKind) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let hits = trades.iter().filter(|t| t.hit(kind)).count();
    hits as f64 / trades.len() as f64
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
