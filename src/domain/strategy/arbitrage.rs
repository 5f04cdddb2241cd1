//! Two-leg spread mean reversion.
//!
//! spread = close(A) - close(B), baseline = SMA(spread). When the spread
//! stretches more than `spread_threshold * |mean|` away from the baseline the
//! strategy opens a market-neutral pair (short the rich leg, long the cheap
//! one); when it comes back within `exit_tolerance * |mean|` both legs close.

use super::params::Params;
use super::{with_stop_loss, StopLoss, Strategy, StrategyContext};
use crate::domain::error::QuantsimError;
use crate::domain::indicator::{IndicatorKey, IndicatorType, PriceSource};
use crate::domain::order::Order;

pub(crate) const KEYS: &[&str] = &[
    "spread_threshold",
    "exit_tolerance",
    "spread_period",
    "position_size",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ArbitrageParams {
    pub spread_threshold: f64,
    pub exit_tolerance: f64,
    pub spread_period: usize,
    pub position_size: i64,
    pub stop_loss: Option<StopLoss>,
}

impl Default for ArbitrageParams {
    fn default() -> Self {
        ArbitrageParams {
            spread_threshold: 0.02,
            exit_tolerance: 0.01,
            spread_period: 20,
            position_size: 10,
            stop_loss: None,
        }
    }
}

impl ArbitrageParams {
    pub(crate) fn from_params(p: &Params<'_>) -> Result<Self, QuantsimError> {
        let defaults = ArbitrageParams::default();
        let spread_threshold = p.f64("spread_threshold", defaults.spread_threshold)?;
        let exit_tolerance = p.f64("exit_tolerance", defaults.exit_tolerance)?;
        if spread_threshold <= 0.0 {
            return Err(Params::invalid(
                "spread_threshold",
                format!("must be positive, got {}", spread_threshold),
            ));
        }
        if exit_tolerance <= 0.0 || exit_tolerance >= spread_threshold {
            return Err(Params::invalid(
                "exit_tolerance",
                format!(
                    "must be positive and below spread_threshold ({}), got {}",
                    spread_threshold, exit_tolerance
                ),
            ));
        }
        Ok(ArbitrageParams {
            spread_threshold,
            exit_tolerance,
            spread_period: p.period("spread_period", defaults.spread_period)?,
            position_size: p.quantity("position_size", defaults.position_size)?,
            stop_loss: StopLoss::from_params(p)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Arbitrage {
    leg_a: String,
    leg_b: String,
    mean: IndicatorKey,
    params: ArbitrageParams,
}

impl Arbitrage {
    pub fn new(leg_a: &str, leg_b: &str, params: ArbitrageParams) -> Self {
        Arbitrage {
            leg_a: leg_a.to_string(),
            leg_b: leg_b.to_string(),
            mean: IndicatorKey::new(
                PriceSource::spread(leg_a, leg_b),
                IndicatorType::Sma(params.spread_period),
            ),
            params,
        }
    }
}

impl Strategy for Arbitrage {
    fn name(&self) -> &'static str {
        "arbitrage"
    }

    fn indicators(&self) -> Vec<IndicatorKey> {
        vec![self.mean.clone()]
    }

    fn on_bar(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Order>, QuantsimError> {
        let mean = ctx.engine.value(&self.mean)?.primary();
        let spread = ctx.broker.price(&self.leg_a)? - ctx.broker.price(&self.leg_b)?;
        let deviation = spread - mean;
        let scale = mean.abs();
        let (a, b) = (self.leg_a.as_str(), self.leg_b.as_str());
        let size = self.params.position_size;
        let flat_a = ctx.broker.position_size(a) == 0;
        let flat_b = ctx.broker.position_size(b) == 0;
        let bar = ctx.bar_index;

        let mut orders = Vec::new();
        if deviation > self.params.spread_threshold * scale {
            if flat_a {
                orders.push(Order::sell(a, size, bar));
            }
            if flat_b {
                orders.push(Order::buy(b, size, bar));
            }
        } else if deviation < -self.params.spread_threshold * scale {
            if flat_a {
                orders.push(Order::buy(a, size, bar));
            }
            if flat_b {
                orders.push(Order::sell(b, size, bar));
            }
        }

        if deviation.abs() < self.params.exit_tolerance * scale {
            for leg in [a, b] {
                if ctx.broker.position_size(leg) != 0 {
                    orders.push(Order::close(leg, bar));
                }
            }
        }
        Ok(with_stop_loss(self.params.stop_loss.as_ref(), ctx, orders))
    }
}
