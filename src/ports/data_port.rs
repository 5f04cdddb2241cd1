//! Market data source port.

use crate::domain::bar_series::BarSeries;
use crate::domain::error::QuantsimError;

/// Supplies one validated, time-ordered series per instrument.
pub trait MarketDataSource {
    fn fetch_series(&self, instrument: &str) -> Result<BarSeries, QuantsimError>;
}
