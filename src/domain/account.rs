//! Account state: cash, open positions and the equity curve point type.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::position::{ClosedTrade, Position};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub total_equity: f64,
}

/// Cash plus positions keyed by instrument.
///
/// Positions live in a `BTreeMap` so equity sums always run in the same
/// order and repeated runs stay bit-identical.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub starting_cash: f64,
    positions: BTreeMap<String, Position>,
}

impl Account {
    pub fn new(starting_cash: f64) -> Self {
        Account {
            cash: starting_cash,
            starting_cash,
            positions: BTreeMap::new(),
        }
    }

    pub fn position(&self, instrument: &str) -> Option<&Position> {
        self.positions.get(instrument)
    }

    /// Signed size, zero when flat.
    pub fn position_size(&self, instrument: &str) -> i64 {
        self.position(instrument).map_or(0, |p| p.size)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// cash + sum(size * price) over positions with a known price.
    pub fn total_equity(&self, prices: &BTreeMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .filter_map(|pos| prices.get(&pos.instrument).map(|&p| pos.market_value(p)))
            .sum();
        self.cash + position_value
    }

    /// Apply a signed fill at `price`.
    ///
    /// Increasing a position re-weights the average price; reducing realises
    /// PnL against it and leaves it unchanged. Returning to flat, or crossing
    /// through zero, closes the trade; the remainder of a reversal opens a new
    /// position at the fill price.
    pub fn apply_fill(
        &mut self,
        instrument: &str,
        quantity: i64,
        price: f64,
        bar_index: usize,
        date: NaiveDate,
    ) -> Option<ClosedTrade> {
        if quantity == 0 {
            return None;
        }
        self.cash -= quantity as f64 * price;

        if !self.positions.contains_key(instrument) {
            self.positions.insert(
                instrument.to_string(),
                Position::open(instrument, quantity, price, bar_index, date),
            );
            return None;
        }
        let pos = self.positions.get_mut(instrument)?;

        let old = pos.size;
        if old.signum() == quantity.signum() {
            let total = old.abs() + quantity.abs();
            pos.avg_price = (old.abs() as f64 * pos.avg_price + quantity.abs() as f64 * price)
                / total as f64;
            pos.size = old + quantity;
            pos.peak_size = pos.peak_size.max(pos.size.abs());
            return None;
        }

        let reduced = quantity.abs().min(old.abs());
        pos.realized_pnl += reduced as f64 * (price - pos.avg_price) * old.signum() as f64;
        let new_size = old + quantity;
        if new_size != 0 && new_size.signum() == old.signum() {
            pos.size = new_size;
            return None;
        }

        let closed = self.positions.remove(instrument)?;
        if new_size != 0 {
            self.positions.insert(
                instrument.to_string(),
                Position::open(instrument, new_size, price, bar_index, date),
            );
        }
        Some(ClosedTrade {
            instrument: closed.instrument,
            size: closed.peak_size * old.signum(),
            entry_price: closed.avg_price,
            exit_price: price,
            entry_index: closed.entry_index,
            exit_index: bar_index,
            entry_date: closed.entry_date,
            exit_date: date,
            pnl: closed.realized_pnl,
        })
    }
}
