//! Indicator engine: owns one rolling state per (source, indicator) pair and
//! advances all of them once per bar.

use std::collections::BTreeMap;
use std::fmt;

use super::{IndicatorState, IndicatorType, IndicatorValue};
use crate::domain::error::QuantsimError;

/// Input stream an indicator is computed over.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriceSource {
    /// Closing price of one instrument.
    Close(String),
    /// close(long) - close(short)
    Spread { long: String, short: String },
}

impl PriceSource {
    pub fn close(instrument: impl Into<String>) -> Self {
        PriceSource::Close(instrument.into())
    }

    pub fn spread(long: impl Into<String>, short: impl Into<String>) -> Self {
        PriceSource::Spread {
            long: long.into(),
            short: short.into(),
        }
    }

    /// Resolve the source against the current bar's closes.
    pub fn resolve(&self, closes: &BTreeMap<String, f64>) -> Option<f64> {
        match self {
            PriceSource::Close(instrument) => closes.get(instrument).copied(),
            PriceSource::Spread { long, short } => {
                Some(closes.get(long)? - closes.get(short)?)
            }
        }
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSource::Close(instrument) => write!(f, "{}", instrument),
            PriceSource::Spread { long, short } => write!(f, "{}-{}", long, short),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndicatorKey {
    pub source: PriceSource,
    pub indicator: IndicatorType,
}

impl IndicatorKey {
    pub fn new(source: PriceSource, indicator: IndicatorType) -> Self {
        IndicatorKey { source, indicator }
    }
}

impl fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.indicator, self.source)
    }
}

#[derive(Debug, Clone)]
struct Tracked {
    state: IndicatorState,
    seen: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    entries: BTreeMap<IndicatorKey, Tracked>,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with every key registered.
    pub fn with_keys<I: IntoIterator<Item = IndicatorKey>>(keys: I) -> Self {
        let mut engine = Self::new();
        for key in keys {
            engine.register(key);
        }
        engine
    }

    /// Register a key. Registering the same key twice shares one state.
    pub fn register(&mut self, key: IndicatorKey) {
        self.entries.entry(key).or_insert_with_key(|k| Tracked {
            state: IndicatorState::new(&k.indicator),
            seen: 0,
        });
    }

    /// Feed one bar's closes to every registered indicator.
    pub fn advance(&mut self, closes: &BTreeMap<String, f64>) -> Result<(), QuantsimError> {
        for (key, tracked) in self.entries.iter_mut() {
            let input = key.source.resolve(closes).ok_or_else(|| {
                QuantsimError::configuration(
                    key.to_string(),
                    format!("no price for source {}", key.source),
                )
            })?;
            tracked.state.update(input);
            tracked.seen += 1;
        }
        Ok(())
    }

    /// True once every registered indicator has produced a value.
    pub fn is_ready(&self) -> bool {
        self.entries.values().all(|t| t.state.value().is_some())
    }

    /// Current reading, or `InsufficientData` while the indicator warms up.
    pub fn value(&self, key: &IndicatorKey) -> Result<IndicatorValue, QuantsimError> {
        let tracked = self.entries.get(key).ok_or_else(|| {
            QuantsimError::configuration(key.to_string(), "indicator was never registered")
        })?;
        tracked
            .state
            .value()
            .ok_or_else(|| QuantsimError::InsufficientData {
                indicator: key.to_string(),
                seen: tracked.seen,
                required: key.indicator.warmup(),
            })
    }
}
