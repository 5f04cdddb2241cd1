//! OHLCV bar representation.

use chrono::NaiveDate;

/// One OHLCV record for one instrument at one date.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// Bar with all four prices equal to `close`.
    pub fn flat(date: NaiveDate, close: f64, volume: i64) -> Self {
        Bar {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    /// First price field that is non-positive or non-finite, if any.
    pub(crate) fn bad_price(&self) -> Option<(&'static str, f64)> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ]
        .into_iter()
        .find(|(_, price)| !price.is_finite() || *price <= 0.0)
    }
}
