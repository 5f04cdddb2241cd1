//! quantsim: deterministic bar-by-bar backtesting engine.
//!
//! Hexagonal architecture: simulation logic in [`domain`], port traits in
//! [`ports`], file and console implementations in [`adapters`], and the
//! command line in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;

pub use domain::analytics::ResultsRecord;
pub use domain::error::QuantsimError;
pub use domain::scheduler::{Backtest, BacktestConfig};
