//! Strategy state machines.
//!
//! A strategy declares the indicators it reads up front and, once they are
//! warm, turns the current bar's indicator values and broker position into a
//! list of orders. Strategies keep no bar-to-bar memory of their own: all
//! state lives in the indicator engine and the broker.
//!
//! The concrete kind is chosen once from configuration and held as a
//! [`StrategyVariant`].

pub mod arbitrage;
pub mod momentum;
pub mod moving_average;
pub mod params;

pub use arbitrage::{Arbitrage, ArbitrageParams};
pub use momentum::{Momentum, MomentumParams};
pub use moving_average::{MaKind, MovingAverage, MovingAverageParams};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::broker::Broker;
use crate::domain::error::QuantsimError;
use crate::domain::indicator::{IndicatorEngine, IndicatorKey};
use crate::domain::order::Order;
use params::Params;

/// Read-only view handed to a strategy for one bar.
pub struct StrategyContext<'a> {
    pub bar_index: usize,
    pub engine: &'a IndicatorEngine,
    pub broker: &'a Broker,
    pub instruments: &'a [String],
}

pub trait Strategy {
    fn name(&self) -> &'static str;

    /// Every indicator `on_bar` will read. Registered before the first bar.
    fn indicators(&self) -> Vec<IndicatorKey>;

    /// Orders for this bar, applied by the broker in the returned order.
    fn on_bar(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Order>, QuantsimError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopLossBaseline {
    /// Compare equity against the cash the run started with.
    StartingCash,
    /// Compare equity against cash on hand at the bar.
    CurrentCash,
}

impl FromStr for StopLossBaseline {
    type Err = QuantsimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "starting_cash" => Ok(StopLossBaseline::StartingCash),
            "current_cash" => Ok(StopLossBaseline::CurrentCash),
            other => Err(Params::invalid(
                "stop_loss_baseline",
                format!("expected starting_cash or current_cash, got '{}'", other),
            )),
        }
    }
}

const STOP_LOSS_KEYS: &[&str] = &["stop_loss_pct", "stop_loss_baseline"];

/// Global stop: once equity drops below `(1 - pct/100) * baseline` every
/// open position is closed, overriding any other decision for the bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopLoss {
    pub pct: f64,
    pub baseline: StopLossBaseline,
}

impl StopLoss {
    pub fn triggered(&self, broker: &Broker) -> bool {
        let baseline = match self.baseline {
            StopLossBaseline::StartingCash => broker.starting_cash(),
            StopLossBaseline::CurrentCash => broker.cash(),
        };
        broker.equity() < baseline * (1.0 - self.pct / 100.0)
    }

    fn from_params(p: &Params<'_>) -> Result<Option<Self>, QuantsimError> {
        let Some(pct) = p.opt_f64("stop_loss_pct")? else {
            return Ok(None);
        };
        if !(0.0..100.0).contains(&pct) {
            return Err(Params::invalid(
                "stop_loss_pct",
                format!("must be in [0, 100), got {}", pct),
            ));
        }
        let baseline = match p.get_str("stop_loss_baseline") {
            Some(s) => s.parse()?,
            None => StopLossBaseline::StartingCash,
        };
        Ok(Some(StopLoss { pct, baseline }))
    }
}

/// Close orders for every instrument with an open position.
pub(crate) fn close_all(ctx: &StrategyContext<'_>) -> Vec<Order> {
    ctx.instruments
        .iter()
        .filter(|i| ctx.broker.position_size(i) != 0)
        .map(|i| Order::close(i, ctx.bar_index))
        .collect()
}

/// Apply the stop-loss override to a bar's orders.
pub(crate) fn with_stop_loss(
    stop: Option<&StopLoss>,
    ctx: &StrategyContext<'_>,
    orders: Vec<Order>,
) -> Vec<Order> {
    match stop {
        Some(stop) if stop.triggered(ctx.broker) => close_all(ctx),
        _ => orders,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyConfig {
    MovingAverage(MovingAverageParams),
    Momentum(MomentumParams),
    Arbitrage(ArbitrageParams),
}

impl StrategyConfig {
    /// Parse the `[strategy]` section. `kind` selects the variant.
    pub fn from_params(kind: &str, raw: &BTreeMap<String, String>) -> Result<Self, QuantsimError> {
        let p = Params::new(raw);
        match kind.trim().to_lowercase().as_str() {
            "moving_average" => {
                p.check_known(&[moving_average::KEYS, STOP_LOSS_KEYS])?;
                Ok(StrategyConfig::MovingAverage(MovingAverageParams::from_params(&p)?))
            }
            "momentum" => {
                p.check_known(&[momentum::KEYS, STOP_LOSS_KEYS])?;
                Ok(StrategyConfig::Momentum(MomentumParams::from_params(&p)?))
            }
            "arbitrage" => {
                p.check_known(&[arbitrage::KEYS, STOP_LOSS_KEYS])?;
                Ok(StrategyConfig::Arbitrage(ArbitrageParams::from_params(&p)?))
            }
            other => Err(QuantsimError::configuration(
                "strategy.kind",
                format!(
                    "unknown strategy kind '{}' (expected moving_average, momentum or arbitrage)",
                    other
                ),
            )),
        }
    }

    /// Instruments a run of this kind needs.
    pub fn required_instruments(&self) -> usize {
        match self {
            StrategyConfig::Arbitrage(_) => 2,
            _ => 1,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StrategyConfig::MovingAverage(_) => "moving_average",
            StrategyConfig::Momentum(_) => "momentum",
            StrategyConfig::Arbitrage(_) => "arbitrage",
        }
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// One strategy instance, resolved once at construction.
#[derive(Debug, Clone)]
pub enum StrategyVariant {
    MovingAverage(MovingAverage),
    Momentum(Momentum),
    Arbitrage(Arbitrage),
}

impl StrategyVariant {
    pub fn build(config: &StrategyConfig, instruments: &[String]) -> Result<Self, QuantsimError> {
        let needed = config.required_instruments();
        if instruments.len() < needed {
            return Err(QuantsimError::configuration(
                "backtest.instruments",
                format!(
                    "{} strategy needs {} instrument(s), got {}",
                    config.kind(),
                    needed,
                    instruments.len()
                ),
            ));
        }
        Ok(match config {
            StrategyConfig::MovingAverage(p) => {
                StrategyVariant::MovingAverage(MovingAverage::new(&instruments[0], p.clone()))
            }
            StrategyConfig::Momentum(p) => {
                StrategyVariant::Momentum(Momentum::new(&instruments[0], p.clone()))
            }
            StrategyConfig::Arbitrage(p) => StrategyVariant::Arbitrage(Arbitrage::new(
                &instruments[0],
                &instruments[1],
                p.clone(),
            )),
        })
    }
}

impl Strategy for StrategyVariant {
    fn name(&self) -> &'static str {
        match self {
            StrategyVariant::MovingAverage(s) => s.name(),
            StrategyVariant::Momentum(s) => s.name(),
            StrategyVariant::Arbitrage(s) => s.name(),
        }
    }

    fn indicators(&self) -> Vec<IndicatorKey> {
        match self {
            StrategyVariant::MovingAverage(s) => s.indicators(),
            StrategyVariant::Momentum(s) => s.indicators(),
            StrategyVariant::Arbitrage(s) => s.indicators(),
        }
    }

    fn on_bar(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Order>, QuantsimError> {
        match self {
            StrategyVariant::MovingAverage(s) => s.on_bar(ctx),
            StrategyVariant::Momentum(s) => s.on_bar(ctx),
            StrategyVariant::Arbitrage(s) => s.on_bar(ctx),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn unknown_kind_is_configuration_error() {
        match StrategyConfig::from_params("pairs", &raw(&[])) {
            Err(QuantsimError::Configuration { key, reason }) => {
                assert_eq!(key, "strategy.kind");
                assert!(reason.contains("pairs"));
            }
            other => panic!("expected Configuration, got {other:?}"),
        }
    }

    #[test]
    fn kind_is_case_insensitive() {
        let cfg = StrategyConfig::from_params(
            "Moving_Average",
            &raw(&[("long_period", "30")]),
        )
        .unwrap();
        assert_eq!(cfg.kind(), "moving_average");
    }

    #[test]
    fn misspelled_key_is_rejected() {
        match StrategyConfig::from_params(
            "momentum",
            &raw(&[("short_period", "5"), ("long_period", "20"), ("stop_loss_pc", "5")]),
        ) {
            Err(QuantsimError::Configuration { key, .. }) => assert_eq!(key, "strategy.stop_loss_pc"),
            other => panic!("expected Configuration, got {other:?}"),
        }
    }

    #[test]
    fn keys_of_another_kind_are_rejected() {
        let err = StrategyConfig::from_params("arbitrage", &raw(&[("ma_kind", "ema")])).unwrap_err();
        assert!(matches!(err, QuantsimError::Configuration { key, .. } if key == "strategy.ma_kind"));
        assert!(StrategyConfig::from_params("moving_average", &raw(&[
            ("ma_kind", "ema"),
            ("long_period", "20"),
            ("stop_loss_pct", "5"),
            ("stop_loss_baseline", "current_cash"),
        ]))
        .is_ok());
    }

    #[test]
    fn arbitrage_needs_two_instruments() {
        let cfg = StrategyConfig::from_params("arbitrage", &raw(&[])).unwrap();
        let err = StrategyVariant::build(&cfg, &["SPY".to_string()]).unwrap_err();
        assert!(matches!(err, QuantsimError::Configuration { .. }));
        assert!(StrategyVariant::build(&cfg, &["SPY".into(), "QQQ".into()]).is_ok());
    }

    #[test]
    fn stop_loss_parses_baseline() {
        let map = raw(&[("stop_loss_pct", "5"), ("stop_loss_baseline", "current_cash")]);
        let stop = StopLoss::from_params(&Params::new(&map)).unwrap().unwrap();
        assert_eq!(stop.baseline, StopLossBaseline::CurrentCash);
        assert!((stop.pct - 5.0).abs() < f64::EPSILON);

        let map = raw(&[]);
        assert!(StopLoss::from_params(&Params::new(&map)).unwrap().is_none());

        let map = raw(&[("stop_loss_pct", "150")]);
        assert!(StopLoss::from_params(&Params::new(&map)).is_err());
    }

    #[test]
    fn stop_loss_compares_against_baseline() {
        let mut broker = Broker::new(1000.0, crate::domain::broker::FundsPolicy::Reject);
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        broker.set_bar(0, date, [("SPY".to_string(), 100.0)].into());
        broker.buy("SPY", 5).unwrap();
        broker.set_bar(1, date, [("SPY".to_string(), 88.0)].into());
        // equity 500 + 440 = 940
        let start = StopLoss {
            pct: 5.0,
            baseline: StopLossBaseline::StartingCash,
        };
        assert!(start.triggered(&broker));
        let current = StopLoss {
            pct: 5.0,
            baseline: StopLossBaseline::CurrentCash,
        };
        assert!(!current.triggered(&broker));
    }
}
