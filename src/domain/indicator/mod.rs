//! Streaming technical indicators.
//!
//! Every indicator consumes one input value per bar through `update` and keeps
//! only the rolling state it needs, so the value at bar `t` is a function of
//! bars `0..=t` alone.
//! - `IndicatorType`: indicator identity + parameters (map key)
//! - `IndicatorValue`: output shape of one reading
//! - `IndicatorState`: owned rolling state for one indicator instance
//! - `IndicatorSeries`: a materialised time series, for reports and tests

pub mod dema;
pub mod ema;
pub mod engine;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod tema;

pub use dema::Dema;
pub use ema::Ema;
pub use engine::{IndicatorEngine, IndicatorKey, PriceSource};
pub use macd::Macd;
pub use rsi::Rsi;
pub use sma::Sma;
pub use tema::Tema;

use crate::domain::ohlcv::Bar;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
}

impl IndicatorValue {
    /// Primary reading: the value itself, or the MACD line.
    pub fn primary(&self) -> f64 {
        match *self {
            IndicatorValue::Simple(v) => v,
            IndicatorValue::Macd { line, .. } => line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Dema(usize),
    Tema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

impl IndicatorType {
    /// Number of input values consumed before the first valid reading.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorType::Sma(p) | IndicatorType::Ema(p) => p,
            IndicatorType::Dema(p) => p.saturating_mul(2).saturating_sub(1),
            IndicatorType::Tema(p) => p.saturating_mul(3).saturating_sub(2),
            IndicatorType::Rsi(p) => p.saturating_add(1),
            IndicatorType::Macd { fast, slow, signal } => {
                fast.max(slow).saturating_add(signal).saturating_sub(1)
            }
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Dema(period) => write!(f, "DEMA({})", period),
            IndicatorType::Tema(period) => write!(f, "TEMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}

/// Rolling state of one indicator instance.
#[derive(Debug, Clone)]
pub enum IndicatorState {
    Sma(Sma),
    Ema(Ema),
    Dema(Dema),
    Tema(Tema),
    Rsi(Rsi),
    Macd(Macd),
}

impl IndicatorState {
    pub fn new(indicator: &IndicatorType) -> Self {
        match *indicator {
            IndicatorType::Sma(p) => IndicatorState::Sma(Sma::new(p)),
            IndicatorType::Ema(p) => IndicatorState::Ema(Ema::new(p)),
            IndicatorType::Dema(p) => IndicatorState::Dema(Dema::new(p)),
            IndicatorType::Tema(p) => IndicatorState::Tema(Tema::new(p)),
            IndicatorType::Rsi(p) => IndicatorState::Rsi(Rsi::new(p)),
            IndicatorType::Macd { fast, slow, signal } => {
                IndicatorState::Macd(Macd::new(fast, slow, signal))
            }
        }
    }

    pub fn update(&mut self, value: f64) {
        match self {
            IndicatorState::Sma(s) => {
                s.update(value);
            }
            IndicatorState::Ema(s) => {
                s.update(value);
            }
            IndicatorState::Dema(s) => {
                s.update(value);
            }
            IndicatorState::Tema(s) => {
                s.update(value);
            }
            IndicatorState::Rsi(s) => {
                s.update(value);
            }
            IndicatorState::Macd(s) => {
                s.update(value);
            }
        }
    }

    pub fn value(&self) -> Option<IndicatorValue> {
        match self {
            IndicatorState::Sma(s) => s.value().map(IndicatorValue::Simple),
            IndicatorState::Ema(s) => s.value().map(IndicatorValue::Simple),
            IndicatorState::Dema(s) => s.value().map(IndicatorValue::Simple),
            IndicatorState::Tema(s) => s.value().map(IndicatorValue::Simple),
            IndicatorState::Rsi(s) => s.value().map(IndicatorValue::Simple),
            IndicatorState::Macd(s) => s.value(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

/// Run an indicator over the closes of `bars`, one point per bar.
///
/// Warm-up points are marked invalid and carry `Simple(0.0)`.
pub fn calculate_series(bars: &[Bar], indicator: IndicatorType) -> IndicatorSeries {
    let mut state = IndicatorState::new(&indicator);
    let values = bars
        .iter()
        .map(|bar| {
            state.update(bar.close);
            match state.value() {
                Some(value) => IndicatorPoint {
                    date: bar.date,
                    valid: true,
                    value,
                },
                None => IndicatorPoint {
                    date: bar.date,
                    valid: false,
                    value: IndicatorValue::Simple(0.0),
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: indicator,
        values,
    }
}
