//! Position tracking and the closed-trade log.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub instrument: String,
    /// Signed size: negative is short.
    pub size: i64,
    pub avg_price: f64,
    /// Largest absolute size reached while the trade was open.
    pub peak_size: i64,
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub realized_pnl: f64,
}

impl Position {
    pub fn open(
        instrument: &str,
        size: i64,
        price: f64,
        entry_index: usize,
        entry_date: NaiveDate,
    ) -> Self {
        Position {
            instrument: instrument.to_string(),
            size,
            avg_price: price,
            peak_size: size.abs(),
            entry_index,
            entry_date,
            realized_pnl: 0.0,
        }
    }

    /// Signed value: shorts contribute negatively to equity.
    pub fn market_value(&self, price: f64) -> f64 {
        self.size as f64 * price
    }
}

/// A round trip from flat back to flat (or through a reversal).
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub instrument: String,
    /// Peak signed size held during the trade.
    pub size: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub pnl: f64,
}

impl ClosedTrade {
    pub fn bars_held(&self) -> usize {
        self.exit_index - self.entry_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn sample_long_position() -> Position {
        Position::open("SPY", 100, 50.0, 3, date())
    }

    fn sample_short_position() -> Position {
        Position::open("QQQ", -100, 100.0, 3, date())
    }

    #[test]
    fn open_records_peak_size() {
        assert_eq!(sample_long_position().peak_size, 100);
        assert_eq!(sample_short_position().peak_size, 100);
        assert_eq!(sample_short_position().size, -100);
    }

    #[test]
    fn market_value_is_signed() {
        assert!((sample_long_position().market_value(55.0) - 5500.0).abs() < f64::EPSILON);
        assert!((sample_short_position().market_value(95.0) + 9500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn closed_trade_bars_held() {
        let trade = ClosedTrade {
            instrument: "SPY".into(),
            size: 100,
            entry_price: 50.0,
            exit_price: 55.0,
            entry_index: 4,
            exit_index: 9,
            entry_date: date(),
            exit_date: date(),
            pnl: 500.0,
        };
        assert_eq!(trade.bars_held(), 5);
    }
}
