//! Trend-following momentum strategy with optional RSI and MACD signals.
//!
//! Signals are evaluated in a fixed order (trend, then RSI, then MACD). Each
//! produces at most one decision; the last non-empty decision is the one
//! submitted. The stop-loss override runs after all of them.

use super::params::Params;
use super::{with_stop_loss, StopLoss, Strategy, StrategyContext};
use crate::domain::error::QuantsimError;
use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::indicator::{IndicatorKey, IndicatorType, IndicatorValue, PriceSource};
use crate::domain::order::Order;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiFilter {
    pub period: usize,
    pub upper: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdFilter {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

pub(crate) const KEYS: &[&str] = &[
    "short_period",
    "long_period",
    "order_size",
    "max_position",
    "use_rsi",
    "rsi_period",
    "rsi_upper",
    "rsi_lower",
    "use_macd",
    "macd_fast",
    "macd_slow",
    "macd_signal",
];

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumParams {
    pub short_period: usize,
    pub long_period: usize,
    pub order_size: i64,
    pub max_position: i64,
    pub rsi: Option<RsiFilter>,
    pub macd: Option<MacdFilter>,
    pub stop_loss: Option<StopLoss>,
}

impl MomentumParams {
    pub(crate) fn from_params(p: &Params<'_>) -> Result<Self, QuantsimError> {
        let short_period = p.require_period("short_period")?;
        let long_period = p.require_period("long_period")?;

        let rsi = if p.bool("use_rsi", false)? {
            let upper = p.f64("rsi_upper", 70.0)?;
            let lower = p.f64("rsi_lower", 30.0)?;
            if !(0.0 <= lower && lower < upper && upper <= 100.0) {
                return Err(Params::invalid(
                    "rsi_upper",
                    format!("need 0 <= rsi_lower < rsi_upper <= 100, got {} / {}", lower, upper),
                ));
            }
            Some(RsiFilter {
                period: p.period("rsi_period", short_period)?,
                upper,
                lower,
            })
        } else {
            None
        };

        let macd = if p.bool("use_macd", false)? {
            Some(MacdFilter {
                fast: p.period("macd_fast", DEFAULT_FAST)?,
                slow: p.period("macd_slow", DEFAULT_SLOW)?,
                signal: p.period("macd_signal", DEFAULT_SIGNAL)?,
            })
        } else {
            None
        };

        Ok(MomentumParams {
            short_period,
            long_period,
            order_size: p.quantity("order_size", 1)?,
            max_position: p.quantity("max_position", 1)?,
            rsi,
            macd,
            stop_loss: StopLoss::from_params(p)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Buy,
    Sell,
}

#[derive(Debug, Clone)]
pub struct Momentum {
    instrument: String,
    short: IndicatorKey,
    long: IndicatorKey,
    rsi: Option<(IndicatorKey, RsiFilter)>,
    macd: Option<IndicatorKey>,
    params: MomentumParams,
}

impl Momentum {
    pub fn new(instrument: &str, params: MomentumParams) -> Self {
        let source = PriceSource::close(instrument);
        let key = |indicator| IndicatorKey::new(source.clone(), indicator);
        Momentum {
            instrument: instrument.to_string(),
            short: key(IndicatorType::Sma(params.short_period)),
            long: key(IndicatorType::Sma(params.long_period)),
            rsi: params
                .rsi
                .map(|f| (key(IndicatorType::Rsi(f.period)), f)),
            macd: params.macd.map(|m| {
                key(IndicatorType::Macd {
                    fast: m.fast,
                    slow: m.slow,
                    signal: m.signal,
                })
            }),
            params,
        }
    }

    /// Drop a decision the position cap does not allow.
    fn capped(&self, decision: Decision, size: i64) -> Option<Decision> {
        let allowed = match decision {
            Decision::Buy => size < self.params.max_position,
            Decision::Sell => -size < self.params.max_position,
        };
        allowed.then_some(decision)
    }

    fn decide(&self, ctx: &StrategyContext<'_>) -> Result<Option<Decision>, QuantsimError> {
        let size = ctx.broker.position_size(&self.instrument);
        let mut decision = None;

        let short = ctx.engine.value(&self.short)?.primary();
        let long = ctx.engine.value(&self.long)?.primary();
        let trend = if short > long {
            Some(Decision::Buy)
        } else if short < long {
            Some(Decision::Sell)
        } else {
            None
        };
        if let Some(d) = trend.and_then(|d| self.capped(d, size)) {
            decision = Some(d);
        }

        if let Some((key, filter)) = &self.rsi {
            let rsi = ctx.engine.value(key)?.primary();
            let signal = if rsi > filter.upper {
                Some(Decision::Sell)
            } else if rsi < filter.lower {
                Some(Decision::Buy)
            } else {
                None
            };
            if let Some(d) = signal.and_then(|d| self.capped(d, size)) {
                decision = Some(d);
            }
        }

        if let Some(key) = &self.macd {
            if let IndicatorValue::Macd { line, signal, .. } = ctx.engine.value(key)? {
                let crossing = if line > signal {
                    Some(Decision::Buy)
                } else if line < signal {
                    Some(Decision::Sell)
                } else {
                    None
                };
                if let Some(d) = crossing.and_then(|d| self.capped(d, size)) {
                    decision = Some(d);
                }
            }
        }

        Ok(decision)
    }
}

impl Strategy for Momentum {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn indicators(&self) -> Vec<IndicatorKey> {
        let mut keys = vec![self.short.clone(), self.long.clone()];
        if let Some((key, _)) = &self.rsi {
            keys.push(key.clone());
        }
        if let Some(key) = &self.macd {
            keys.push(key.clone());
        }
        keys
    }

    fn on_bar(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Order>, QuantsimError> {
        let size = self.params.order_size;
        let orders = match self.decide(ctx)? {
            Some(Decision::Buy) => vec![Order::buy(&self.instrument, size, ctx.bar_index)],
            Some(Decision::Sell) => vec![Order::sell(&self.instrument, size, ctx.bar_index)],
            None => Vec::new(),
        };
        Ok(with_stop_loss(self.params.stop_loss.as_ref(), ctx, orders))
    }
}
