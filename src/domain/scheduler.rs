//! Simulation loop.
//!
//! [`Backtest::new`] validates the whole configuration before any bar is
//! touched. [`Backtest::run`] then replays the aligned series bar by bar:
//!
//! 1. advance every registered indicator with the bar's closes,
//! 2. once all of them are warm, ask the strategy for orders,
//! 3. apply the orders to the broker in emission order,
//! 4. mark to market, appending one equity point.
//!
//! Series are aligned by index and the run stops at the shortest one. Every
//! aligned bar must carry the same date in each series.
//! Each run builds its own engine and broker, so a `Backtest` can be run
//! repeatedly (or from several threads) with identical results.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use super::analytics::{ResultsRecord, RunInfo};
use super::bar_series::BarSeries;
use super::broker::{Broker, FundsPolicy};
use super::error::QuantsimError;
use super::indicator::IndicatorEngine;
use super::strategy::{Strategy, StrategyConfig, StrategyContext, StrategyVariant};

pub const DEFAULT_BARS_PER_YEAR: usize = 252;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    /// One series per instrument, in strategy leg order.
    pub instrument_series: Vec<BarSeries>,
    pub starting_cash: f64,
    pub strategy: StrategyConfig,
    pub bars_per_year: usize,
    /// Annual rate, used by the Sharpe ratio.
    pub risk_free_rate: f64,
    pub funds_policy: FundsPolicy,
}

impl BacktestConfig {
    pub fn new(instrument_series: Vec<BarSeries>, starting_cash: f64, strategy: StrategyConfig) -> Self {
        BacktestConfig {
            instrument_series,
            starting_cash,
            strategy,
            bars_per_year: DEFAULT_BARS_PER_YEAR,
            risk_free_rate: 0.0,
            funds_policy: FundsPolicy::default(),
        }
    }
}

/// Broker state at the end of a run plus loop bookkeeping.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub broker: Broker,
    pub bars_processed: usize,
    /// First bar at which every indicator was ready.
    pub first_ready: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Backtest {
    config: BacktestConfig,
    instruments: Vec<String>,
    strategy: StrategyVariant,
}

impl Backtest {
    pub fn new(config: BacktestConfig) -> Result<Self, QuantsimError> {
        if !config.starting_cash.is_finite() || config.starting_cash <= 0.0 {
            return Err(QuantsimError::configuration(
                "backtest.starting_cash",
                format!("must be positive, got {}", config.starting_cash),
            ));
        }
        if config.bars_per_year == 0 {
            return Err(QuantsimError::configuration(
                "backtest.bars_per_year",
                "must be at least 1",
            ));
        }
        if !config.risk_free_rate.is_finite() {
            return Err(QuantsimError::configuration(
                "backtest.risk_free_rate",
                "must be finite",
            ));
        }
        if config.instrument_series.is_empty() {
            return Err(QuantsimError::configuration(
                "backtest.instruments",
                "at least one instrument series is required",
            ));
        }

        let instruments: Vec<String> = config
            .instrument_series
            .iter()
            .map(|s| s.instrument().to_string())
            .collect();
        let mut seen = BTreeSet::new();
        for name in &instruments {
            if !seen.insert(name.as_str()) {
                return Err(QuantsimError::configuration(
                    "backtest.instruments",
                    format!("instrument '{}' listed twice", name),
                ));
            }
        }

        check_dates(&config.instrument_series)?;

        let strategy = StrategyVariant::build(&config.strategy, &instruments)?;
        Ok(Backtest {
            config,
            instruments,
            strategy,
        })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    /// Number of bars every series has in common.
    pub fn aligned_len(&self) -> usize {
        self.config
            .instrument_series
            .iter()
            .map(BarSeries::len)
            .min()
            .unwrap_or(0)
    }

    fn closes_at(&self, index: usize) -> BTreeMap<String, f64> {
        self.config
            .instrument_series
            .iter()
            .filter_map(|s| s.close(index).map(|c| (s.instrument().to_string(), c)))
            .collect()
    }

    /// Replay every aligned bar and hand back the final broker state.
    pub fn simulate(&self) -> Result<Simulation, QuantsimError> {
        let len = self.aligned_len();
        let longest = self
            .config
            .instrument_series
            .iter()
            .map(BarSeries::len)
            .max()
            .unwrap_or(0);
        if longest != len {
            warn!(
                shortest = len,
                longest,
                "series lengths differ; stopping at the shortest"
            );
        }

        info!(
            strategy = self.strategy.name(),
            instruments = ?self.instruments,
            bars = len,
            cash = self.config.starting_cash,
            "backtest started"
        );

        let mut engine = IndicatorEngine::with_keys(self.strategy.indicators());
        let mut broker = Broker::new(self.config.starting_cash, self.config.funds_policy);
        let mut first_ready = None;
        let timeline = &self.config.instrument_series[0];

        for index in 0..len {
            let Some(bar) = timeline.get(index) else {
                break;
            };
            let closes = self.closes_at(index);
            engine.advance(&closes)?;
            broker.set_bar(index, bar.date, closes);

            if !engine.is_ready() {
                debug!(bar = index, "indicators warming up");
                continue;
            }
            first_ready.get_or_insert(index);

            let ctx = StrategyContext {
                bar_index: index,
                engine: &engine,
                broker: &broker,
                instruments: &self.instruments,
            };
            let orders = match self.strategy.on_bar(&ctx) {
                Ok(orders) => orders,
                Err(e) if !e.is_fatal() => {
                    debug!(bar = index, error = %e, "strategy skipped bar");
                    Vec::new()
                }
                Err(e) => return Err(e),
            };

            for order in &orders {
                match broker.execute(order) {
                    Ok(_) => {}
                    Err(e) if !e.is_fatal() => {}
                    Err(e) => return Err(e),
                }
            }
            broker.mark_to_market();
        }

        if first_ready.is_none() {
            warn!(bars = len, "indicators never warmed up; no equity recorded");
        }

        Ok(Simulation {
            broker,
            bars_processed: len,
            first_ready,
        })
    }

    pub fn run(&self) -> Result<ResultsRecord, QuantsimError> {
        let sim = self.simulate()?;
        let results = ResultsRecord::compute(
            &sim.broker,
            &RunInfo {
                strategy: self.strategy.name(),
                instruments: &self.instruments,
                bars_processed: sim.bars_processed,
                bars_per_year: self.config.bars_per_year,
                risk_free_rate: self.config.risk_free_rate,
            },
        );
        info!(
            final_equity = results.final_equity,
            final_cash = results.final_cash,
            trades = results.closed_trades,
            rejected = results.rejected_orders,
            "backtest finished"
        );
        Ok(results)
    }
}

/// Every aligned index must fall on the same date as the first series.
fn check_dates(all: &[BarSeries]) -> Result<(), QuantsimError> {
    let Some((timeline, rest)) = all.split_first() else {
        return Ok(());
    };
    for series in rest {
        let len = timeline.len().min(series.len());
        for index in 0..len {
            let (Some(expected), Some(bar)) = (timeline.get(index), series.get(index)) else {
                break;
            };
            if bar.date != expected.date {
                return Err(QuantsimError::InvalidData {
                    instrument: series.instrument().to_string(),
                    index,
                    reason: format!(
                        "date {} does not match {} on {}",
                        bar.date,
                        timeline.instrument(),
                        expected.date
                    ),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;
    use crate::domain::strategy::{MaKind, MovingAverageParams};

    fn ma_config(short: usize, long: usize, max_position: i64) -> StrategyConfig {
        StrategyConfig::MovingAverage(MovingAverageParams {
            ma_kind: MaKind::Sma,
            short_period: short,
            long_period: long,
            order_size: 1,
            max_position,
            stop_loss: None,
        })
    }

    fn series(name: &str, closes: &[f64]) -> BarSeries {
        BarSeries::new(name, make_bars(closes)).unwrap()
    }

    #[test]
    fn rejects_non_positive_cash() {
        let cfg = BacktestConfig::new(vec![series("SPY", &[1.0, 2.0])], 0.0, ma_config(1, 2, 1));
        assert!(matches!(
            Backtest::new(cfg),
            Err(QuantsimError::Configuration { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_instruments() {
        let cfg = BacktestConfig::new(
            vec![series("SPY", &[1.0]), series("SPY", &[1.0])],
            1000.0,
            ma_config(1, 2, 1),
        );
        assert!(Backtest::new(cfg).is_err());
    }

    #[test]
    fn rejects_dates_that_disagree_across_series() {
        let shifted: Vec<_> = make_bars(&[50.0; 5])
            .into_iter()
            .map(|mut bar| {
                bar.date += chrono::Duration::days(1);
                bar
            })
            .collect();
        let cfg = BacktestConfig::new(
            vec![
                series("SPY", &[100.0; 5]),
                BarSeries::new("QQQ", shifted).unwrap(),
            ],
            1000.0,
            ma_config(2, 3, 1),
        );
        match Backtest::new(cfg) {
            Err(QuantsimError::InvalidData {
                instrument, index, ..
            }) => {
                assert_eq!(instrument, "QQQ");
                assert_eq!(index, 0);
            }
            other => panic!("expected InvalidData, got {other:?}"),
        }
    }

    #[test]
    fn equity_curve_starts_when_indicators_are_ready() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let bt = Backtest::new(BacktestConfig::new(
            vec![series("SPY", &closes)],
            1000.0,
            ma_config(2, 4, 1),
        ))
        .unwrap();
        let sim = bt.simulate().unwrap();
        assert_eq!(sim.first_ready, Some(3));
        assert_eq!(sim.broker.equity_curve().len(), 7);
        assert_eq!(sim.broker.equity_curve()[0].bar_index, 3);
        assert_eq!(sim.bars_processed, 10);
    }

    #[test]
    fn stops_at_shortest_series() {
        let bt = Backtest::new(BacktestConfig::new(
            vec![series("SPY", &[100.0; 8]), series("QQQ", &[50.0; 5])],
            1000.0,
            ma_config(2, 3, 1),
        ))
        .unwrap();
        assert_eq!(bt.aligned_len(), 5);
        let sim = bt.simulate().unwrap();
        assert_eq!(sim.bars_processed, 5);
        assert_eq!(sim.broker.equity_curve().last().unwrap().bar_index, 4);
    }

    #[test]
    fn never_ready_run_keeps_cash() {
        let bt = Backtest::new(BacktestConfig::new(
            vec![series("SPY", &[100.0, 101.0, 102.0])],
            1000.0,
            ma_config(2, 10, 1),
        ))
        .unwrap();
        let results = bt.run().unwrap();
        assert_eq!(results.bars_processed, 3);
        assert!((results.final_equity - 1000.0).abs() < f64::EPSILON);
        assert_eq!(results.sharpe_ratio, None);
    }

    #[test]
    fn rejected_orders_do_not_abort() {
        // Cash covers no share at all: every buy is rejected.
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let bt = Backtest::new(BacktestConfig::new(
            vec![series("SPY", &closes)],
            50.0,
            ma_config(2, 4, 1),
        ))
        .unwrap();
        let results = bt.run().unwrap();
        assert!(results.rejected_orders > 0);
        assert_eq!(results.closed_trades, 0);
        assert!((results.final_cash - 50.0).abs() < f64::EPSILON);
    }
}
