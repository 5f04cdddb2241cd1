//! Performance analytics over the equity curve and the closed-trade log.

use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;

use super::account::EquityPoint;
use super::broker::Broker;
use super::position::ClosedTrade;

/// Standard deviations below this are treated as zero.
const STD_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsRecord {
    pub strategy: String,
    pub instruments: Vec<String>,
    pub starting_cash: f64,
    pub final_cash: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub annual_return: f64,
    /// Calendar year to that year's return.
    pub yearly_returns: BTreeMap<i32, f64>,
    pub sharpe_ratio: Option<f64>,
    pub sqn: Option<f64>,
    /// Percent, in [0, 100].
    pub max_drawdown: f64,
    pub max_drawdown_money: f64,
    /// Longest run of bars spent below a prior peak.
    pub max_drawdown_len: usize,
    pub closed_trades: usize,
    /// Executed fills, including both legs of every round trip.
    pub fills: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub rejected_orders: usize,
    pub bars_processed: usize,
}

/// Run-level inputs the broker does not know about.
#[derive(Debug, Clone, Copy)]
pub struct RunInfo<'a> {
    pub strategy: &'a str,
    pub instruments: &'a [String],
    pub bars_processed: usize,
    pub bars_per_year: usize,
    pub risk_free_rate: f64,
}

impl ResultsRecord {
    pub fn compute(broker: &Broker, run: &RunInfo<'_>) -> Self {
        let curve = broker.equity_curve();
        let trades = broker.closed_trades();
        let starting_cash = broker.starting_cash();
        let final_equity = curve
            .last()
            .map(|p| p.total_equity)
            .unwrap_or_else(|| broker.equity());

        let total_return = if starting_cash > 0.0 {
            final_equity / starting_cash - 1.0
        } else {
            0.0
        };
        let drawdown = Drawdown::compute(curve);

        ResultsRecord {
            strategy: run.strategy.to_string(),
            instruments: run.instruments.to_vec(),
            starting_cash,
            final_cash: broker.cash(),
            final_equity,
            total_return,
            annual_return: annual_return(starting_cash, final_equity, curve.len(), run.bars_per_year),
            yearly_returns: yearly_returns(curve, starting_cash),
            sharpe_ratio: sharpe_ratio(curve, run.bars_per_year, run.risk_free_rate),
            sqn: sqn(trades),
            max_drawdown: drawdown.pct,
            max_drawdown_money: drawdown.money,
            max_drawdown_len: drawdown.len,
            closed_trades: trades.len(),
            fills: broker.fills().len(),
            trades_won: trades.iter().filter(|t| t.pnl > 0.0).count(),
            trades_lost: trades.iter().filter(|t| t.pnl < 0.0).count(),
            rejected_orders: broker.rejected_orders(),
            bars_processed: run.bars_processed,
        }
    }
}

/// Compounded return scaled to one year of `bars_per_year` bars.
pub fn annual_return(starting: f64, final_equity: f64, points: usize, bars_per_year: usize) -> f64 {
    if points == 0 || starting <= 0.0 {
        return 0.0;
    }
    if final_equity <= 0.0 {
        return -1.0;
    }
    let years = points as f64 / bars_per_year as f64;
    (final_equity / starting).powf(1.0 / years) - 1.0
}

/// Return per calendar year. Each year starts from the previous year's last
/// equity (starting cash for the first year).
pub fn yearly_returns(curve: &[EquityPoint], starting: f64) -> BTreeMap<i32, f64> {
    let mut last_by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for point in curve {
        last_by_year.insert(point.date.year(), point.total_equity);
    }
    let mut prev = starting;
    let mut out = BTreeMap::new();
    for (year, end) in last_by_year {
        let ret = if prev != 0.0 { end / prev - 1.0 } else { 0.0 };
        out.insert(year, ret);
        prev = end;
    }
    out
}

fn bar_returns(curve: &[EquityPoint]) -> Vec<f64> {
    curve
        .windows(2)
        .map(|w| {
            let prev = w[0].total_equity;
            if prev > 0.0 {
                w[1].total_equity / prev - 1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Annualised Sharpe ratio of per-bar returns. `None` when there are fewer
/// than two returns or they have no spread.
pub fn sharpe_ratio(curve: &[EquityPoint], bars_per_year: usize, risk_free_rate: f64) -> Option<f64> {
    let returns = bar_returns(curve);
    if returns.len() < 2 {
        return None;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    if stddev < STD_EPSILON {
        return None;
    }
    let per_bar_rf = risk_free_rate / bars_per_year as f64;
    Some((mean - per_bar_rf) / stddev * (bars_per_year as f64).sqrt())
}

/// System Quality Number: sqrt(n) * mean(pnl) / stddev(pnl), sample stddev.
pub fn sqn(trades: &[ClosedTrade]) -> Option<f64> {
    if trades.len() < 2 {
        return None;
    }
    let n = trades.len() as f64;
    let mean = trades.iter().map(|t| t.pnl).sum::<f64>() / n;
    let variance = trades.iter().map(|t| (t.pnl - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();
    if stddev < STD_EPSILON {
        return None;
    }
    Some(n.sqrt() * mean / stddev)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Drawdown {
    pub pct: f64,
    pub money: f64,
    pub len: usize,
}

impl Drawdown {
    pub fn compute(curve: &[EquityPoint]) -> Self {
        let Some(first) = curve.first() else {
            return Drawdown::default();
        };
        let mut peak = first.total_equity;
        let mut worst = Drawdown::default();
        let mut run = 0usize;

        for point in curve {
            let equity = point.total_equity;
            if equity >= peak {
                peak = equity;
                run = 0;
                continue;
            }
            run += 1;
            worst.len = worst.len.max(run);
            worst.money = worst.money.max(peak - equity);
            if peak > 0.0 {
                let pct = ((peak - equity) / peak * 100.0).clamp(0.0, 100.0);
                worst.pct = worst.pct.max(pct);
            }
        }
        worst
    }
}
