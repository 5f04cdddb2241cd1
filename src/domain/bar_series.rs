//! Validated, time-ordered bar sequence for one instrument.

use crate::domain::error::QuantsimError;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    instrument: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Validate and wrap a pre-sorted list of bars.
    ///
    /// Rejects empty series, non-increasing dates, non-positive prices and
    /// negative volume with [`QuantsimError::InvalidData`].
    pub fn new(instrument: impl Into<String>, bars: Vec<Bar>) -> Result<Self, QuantsimError> {
        let instrument = instrument.into();
        let invalid = |index: usize, reason: String| QuantsimError::InvalidData {
            instrument: instrument.clone(),
            index,
            reason,
        };

        if bars.is_empty() {
            return Err(invalid(0, "series has no bars".to_string()));
        }

        for (i, bar) in bars.iter().enumerate() {
            if let Some((field, price)) = bar.bad_price() {
                return Err(invalid(i, format!("non-positive {field} price {price}")));
            }
            if bar.volume < 0 {
                return Err(invalid(i, format!("negative volume {}", bar.volume)));
            }
            if i > 0 && bar.date <= bars[i - 1].date {
                return Err(invalid(
                    i,
                    format!(
                        "date {} does not follow {}",
                        bar.date,
                        bars[i - 1].date
                    ),
                ));
            }
        }

        Ok(BarSeries { instrument, bars })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn close(&self, index: usize) -> Option<f64> {
        self.bars.get(index).map(|b| b.close)
    }
}
