//! Short/long moving-average trend strategy over one instrument.

use std::str::FromStr;

use super::params::Params;
use super::{with_stop_loss, StopLoss, Strategy, StrategyContext};
use crate::domain::error::QuantsimError;
use crate::domain::indicator::{IndicatorKey, IndicatorType, PriceSource};
use crate::domain::order::Order;

/// Bars per month when the long period is given in months.
pub const BARS_PER_MONTH: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaKind {
    Sma,
    Ema,
    Dema,
    Tema,
}

impl MaKind {
    pub fn indicator(self, period: usize) -> IndicatorType {
        match self {
            MaKind::Sma => IndicatorType::Sma(period),
            MaKind::Ema => IndicatorType::Ema(period),
            MaKind::Dema => IndicatorType::Dema(period),
            MaKind::Tema => IndicatorType::Tema(period),
        }
    }
}

impl FromStr for MaKind {
    type Err = QuantsimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sma" => Ok(MaKind::Sma),
            "ema" => Ok(MaKind::Ema),
            "dema" => Ok(MaKind::Dema),
            "tema" => Ok(MaKind::Tema),
            other => Err(Params::invalid(
                "ma_kind",
                format!("expected sma, ema, dema or tema, got '{}'", other),
            )),
        }
    }
}

pub(crate) const KEYS: &[&str] = &[
    "ma_kind",
    "short_period",
    "long_period",
    "long_months",
    "order_size",
    "max_position",
];

#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverageParams {
    pub ma_kind: MaKind,
    pub short_period: usize,
    pub long_period: usize,
    pub order_size: i64,
    pub max_position: i64,
    pub stop_loss: Option<StopLoss>,
}

impl MovingAverageParams {
    pub(crate) fn from_params(p: &Params<'_>) -> Result<Self, QuantsimError> {
        let ma_kind = match p.get_str("ma_kind") {
            Some(s) => s.parse()?,
            None => MaKind::Sma,
        };
        let long_period = match (p.opt_period("long_period")?, p.opt_period("long_months")?) {
            (Some(bars), _) => bars,
            (None, Some(months)) => months
                .checked_mul(BARS_PER_MONTH)
                .ok_or_else(|| Params::invalid("long_months", format!("{} months is too long", months)))?,
            (None, None) => {
                return Err(Params::invalid(
                    "long_period",
                    "one of long_period or long_months is required",
                ))
            }
        };
        Ok(MovingAverageParams {
            ma_kind,
            short_period: p.period("short_period", 10)?,
            long_period,
            order_size: p.quantity("order_size", 1)?,
            max_position: p.quantity("max_position", 1)?,
            stop_loss: StopLoss::from_params(p)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MovingAverage {
    instrument: String,
    short: IndicatorKey,
    long: IndicatorKey,
    params: MovingAverageParams,
}

impl MovingAverage {
    pub fn new(instrument: &str, params: MovingAverageParams) -> Self {
        let source = PriceSource::close(instrument);
        MovingAverage {
            instrument: instrument.to_string(),
            short: IndicatorKey::new(source.clone(), params.ma_kind.indicator(params.short_period)),
            long: IndicatorKey::new(source, params.ma_kind.indicator(params.long_period)),
            params,
        }
    }
}

impl Strategy for MovingAverage {
    fn name(&self) -> &'static str {
        "moving_average"
    }

    fn indicators(&self) -> Vec<IndicatorKey> {
        vec![self.short.clone(), self.long.clone()]
    }

    fn on_bar(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Order>, QuantsimError> {
        let short = ctx.engine.value(&self.short)?.primary();
        let long = ctx.engine.value(&self.long)?.primary();
        let size = ctx.broker.position_size(&self.instrument);
        let p = &self.params;

        let mut orders = Vec::new();
        if short > long && size < p.max_position {
            orders.push(Order::buy(&self.instrument, p.order_size, ctx.bar_index));
        } else if short < long && -size < p.max_position {
            orders.push(Order::sell(&self.instrument, p.order_size, ctx.bar_index));
        }
        Ok(with_stop_loss(p.stop_loss.as_ref(), ctx, orders))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::warm;
    use super::*;
    use crate::domain::order::OrderKind;
    use std::collections::BTreeMap;

    fn params(short: usize, long: usize) -> MovingAverageParams {
        MovingAverageParams {
            ma_kind: MaKind::Sma,
            short_period: short,
            long_period: long,
            order_size: 1,
            max_position: 1,
            stop_loss: None,
        }
    }

    fn orders_for(strategy: &MovingAverage, closes: &[f64]) -> Vec<Order> {
        let (engine, broker) = warm(strategy, "SPY", closes, 1000.0);
        let instruments = vec!["SPY".to_string()];
        let ctx = StrategyContext {
            bar_index: closes.len() - 1,
            engine: &engine,
            broker: &broker,
            instruments: &instruments,
        };
        strategy.on_bar(&ctx).unwrap()
    }

    #[test]
    fn uptrend_buys() {
        let strategy = MovingAverage::new("SPY", params(2, 4));
        let orders = orders_for(&strategy, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(orders, vec![Order::buy("SPY", 1, 3)]);
    }

    #[test]
    fn downtrend_sells() {
        let strategy = MovingAverage::new("SPY", params(2, 4));
        let orders = orders_for(&strategy, &[4.0, 3.0, 2.0, 1.0]);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].kind, OrderKind::Market { quantity: -1 });
    }

    #[test]
    fn equal_averages_do_nothing() {
        let strategy = MovingAverage::new("SPY", params(2, 4));
        assert!(orders_for(&strategy, &[5.0; 4]).is_empty());
    }

    #[test]
    fn indicators_share_kind() {
        let mut p = params(3, 9);
        p.ma_kind = MaKind::Tema;
        let strategy = MovingAverage::new("SPY", p);
        let kinds: Vec<_> = strategy.indicators().into_iter().map(|k| k.indicator).collect();
        assert_eq!(kinds, vec![IndicatorType::Tema(3), IndicatorType::Tema(9)]);
    }

    #[test]
    fn long_months_converts_to_bars() {
        let raw: BTreeMap<String, String> = [("long_months".to_string(), "3".to_string())].into();
        let p = MovingAverageParams::from_params(&Params::new(&raw)).unwrap();
        assert_eq!(p.long_period, 63);
        assert_eq!(p.short_period, 10);
        assert_eq!(p.ma_kind, MaKind::Sma);
    }

    #[test]
    fn oversized_long_months_is_configuration_error() {
        let raw: BTreeMap<String, String> =
            [("long_months".to_string(), "900000000000000000".to_string())].into();
        match MovingAverageParams::from_params(&Params::new(&raw)) {
            Err(QuantsimError::Configuration { key, .. }) => assert_eq!(key, "strategy.long_months"),
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn long_period_is_required() {
        let raw = BTreeMap::new();
        assert!(MovingAverageParams::from_params(&Params::new(&raw)).is_err());
    }

    #[test]
    fn unknown_ma_kind_rejected() {
        let raw: BTreeMap<String, String> = [
            ("long_period".to_string(), "30".to_string()),
            ("ma_kind".to_string(), "hull".to_string()),
        ]
        .into();
        assert!(MovingAverageParams::from_params(&Params::new(&raw)).is_err());
    }
}
