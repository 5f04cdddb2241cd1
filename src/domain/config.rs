//! Run settings read from a [`ConfigPort`] and validated once, before any
//! data is loaded or any bar is processed.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;

use crate::domain::bar_series::BarSeries;
use crate::domain::broker::FundsPolicy;
use crate::domain::error::QuantsimError;
use crate::domain::scheduler::{BacktestConfig, DEFAULT_BARS_PER_YEAR};
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataSource;

pub const DEFAULT_STARTING_CASH: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub instruments: Vec<String>,
    pub data_dir: PathBuf,
    pub starting_cash: f64,
    pub bars_per_year: usize,
    pub risk_free_rate: f64,
    pub funds_policy: FundsPolicy,
    pub strategy_kind: String,
    /// Raw `[strategy]` keys other than `kind`.
    pub strategy_params: BTreeMap<String, String>,
}

fn parse_opt<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    expected: &str,
) -> Result<Option<T>, QuantsimError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            QuantsimError::configuration(
                format!("{}.{}", section, key),
                format!("expected {}, got '{}'", expected, raw.trim()),
            )
        }),
    }
}

impl RunSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantsimError> {
        let starting_cash = parse_opt::<f64>(config, "backtest", "starting_cash", "a number")?
            .unwrap_or(DEFAULT_STARTING_CASH);
        validate_starting_cash(starting_cash)?;

        let bars_per_year = parse_opt::<usize>(config, "backtest", "bars_per_year", "an integer")?
            .unwrap_or(DEFAULT_BARS_PER_YEAR);
        if bars_per_year == 0 {
            return Err(QuantsimError::configuration(
                "backtest.bars_per_year",
                "must be at least 1",
            ));
        }

        let risk_free_rate = parse_opt::<f64>(config, "backtest", "risk_free_rate", "a number")?
            .unwrap_or(0.0);
        if !(0.0..1.0).contains(&risk_free_rate) {
            return Err(QuantsimError::configuration(
                "backtest.risk_free_rate",
                format!("must be in [0, 1), got {}", risk_free_rate),
            ));
        }

        let funds_policy = match config.get_string("backtest", "insufficient_funds") {
            Some(s) if !s.trim().is_empty() => s.parse()?,
            _ => FundsPolicy::default(),
        };

        let instruments = parse_instruments(config.get_string("backtest", "instruments"))?;
        let data_dir = config
            .get_string("backtest", "data_dir")
            .filter(|s| !s.trim().is_empty())
            .map(|s| PathBuf::from(s.trim()))
            .unwrap_or_else(|| PathBuf::from("."));

        let mut strategy_params = config.get_section("strategy");
        let strategy_kind = strategy_params
            .remove("kind")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                QuantsimError::configuration("strategy.kind", "required parameter is missing")
            })?;

        let settings = RunSettings {
            instruments,
            data_dir,
            starting_cash,
            bars_per_year,
            risk_free_rate,
            funds_policy,
            strategy_kind,
            strategy_params,
        };
        // Surface strategy errors now rather than after data is loaded.
        settings.strategy()?;
        debug!(?settings, "configuration loaded");
        Ok(settings)
    }

    pub fn strategy(&self) -> Result<StrategyConfig, QuantsimError> {
        StrategyConfig::from_params(&self.strategy_kind, &self.strategy_params)
    }

    /// Copy with one strategy parameter replaced.
    pub fn with_param(&self, key: &str, value: &str) -> Self {
        let mut next = self.clone();
        next.strategy_params
            .insert(key.to_lowercase(), value.to_string());
        next
    }

    pub fn set_starting_cash(&mut self, cash: f64) -> Result<(), QuantsimError> {
        validate_starting_cash(cash)?;
        self.starting_cash = cash;
        Ok(())
    }

    pub fn load_series(&self, source: &dyn MarketDataSource) -> Result<Vec<BarSeries>, QuantsimError> {
        self.instruments
            .iter()
            .map(|i| source.fetch_series(i))
            .collect()
    }

    pub fn backtest_config(&self, series: Vec<BarSeries>) -> Result<BacktestConfig, QuantsimError> {
        Ok(BacktestConfig {
            instrument_series: series,
            starting_cash: self.starting_cash,
            strategy: self.strategy()?,
            bars_per_year: self.bars_per_year,
            risk_free_rate: self.risk_free_rate,
            funds_policy: self.funds_policy,
        })
    }
}

fn validate_starting_cash(value: f64) -> Result<(), QuantsimError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(QuantsimError::configuration(
            "backtest.starting_cash",
            format!("must be positive, got {}", value),
        ));
    }
    Ok(())
}

fn parse_instruments(raw: Option<String>) -> Result<Vec<String>, QuantsimError> {
    let instruments: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if instruments.is_empty() {
        return Err(QuantsimError::configuration(
            "backtest.instruments",
            "required parameter is missing",
        ));
    }
    Ok(instruments)
}
