//! Parameter sweeps: independent backtests over one data set, run in parallel.

use rayon::prelude::*;
use tracing::info;

use super::analytics::ResultsRecord;
use super::config::RunSettings;
use super::error::QuantsimError;
use super::scheduler::{Backtest, BacktestConfig};
use super::strategy::StrategyConfig;

/// Run `base` once per strategy override.
///
/// Every run owns its own engine, broker and equity curve. Results come back
/// in the order of `overrides`, each with its own outcome.
pub fn run_sweep(
    base: &BacktestConfig,
    overrides: &[StrategyConfig],
) -> Vec<Result<ResultsRecord, QuantsimError>> {
    info!(runs = overrides.len(), "parameter sweep started");
    overrides
        .par_iter()
        .map(|strategy| {
            let config = BacktestConfig {
                strategy: strategy.clone(),
                ..base.clone()
            };
            Backtest::new(config)?.run()
        })
        .collect()
}

/// One strategy config per value of `param`, all other settings unchanged.
/// Fails on the first value that does not parse.
pub fn param_grid(
    settings: &RunSettings,
    param: &str,
    values: &[String],
) -> Result<Vec<StrategyConfig>, QuantsimError> {
    if values.is_empty() {
        return Err(QuantsimError::configuration(
            format!("strategy.{}", param),
            "sweep needs at least one value",
        ));
    }
    values
        .iter()
        .map(|v| settings.with_param(param, v).strategy())
        .collect()
}
