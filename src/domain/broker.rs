//! Broker simulator: single-price fills at the current bar's close.
//!
//! The broker owns the [`Account`] for one run. The scheduler moves it from
//! bar to bar with [`Broker::set_bar`], strategies submit orders through
//! [`Broker::execute`], and [`Broker::mark_to_market`] appends exactly one
//! equity point per bar.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use super::account::{Account, EquityPoint};
use super::error::QuantsimError;
use super::order::{Order, OrderKind};
use super::position::ClosedTrade;

/// What to do with a buy that would drive cash below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FundsPolicy {
    /// Reject the order as a no-op.
    #[default]
    Reject,
    /// Let cash go negative.
    Margin,
}

impl FromStr for FundsPolicy {
    type Err = QuantsimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(FundsPolicy::Reject),
            "margin" => Ok(FundsPolicy::Margin),
            other => Err(QuantsimError::configuration(
                "backtest.insufficient_funds",
                format!("expected reject or margin, got '{}'", other),
            )),
        }
    }
}

impl fmt::Display for FundsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundsPolicy::Reject => write!(f, "reject"),
            FundsPolicy::Margin => write!(f, "margin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub instrument: String,
    /// Signed quantity: positive bought, negative sold.
    pub quantity: i64,
    pub price: f64,
    pub bar_index: usize,
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct Broker {
    account: Account,
    policy: FundsPolicy,
    prices: BTreeMap<String, f64>,
    bar_index: usize,
    date: Option<NaiveDate>,
    closed_trades: Vec<ClosedTrade>,
    fills: Vec<Fill>,
    equity_curve: Vec<EquityPoint>,
    rejected_orders: usize,
}

impl Broker {
    pub fn new(starting_cash: f64, policy: FundsPolicy) -> Self {
        Broker {
            account: Account::new(starting_cash),
            policy,
            prices: BTreeMap::new(),
            bar_index: 0,
            date: None,
            closed_trades: Vec::new(),
            fills: Vec::new(),
            equity_curve: Vec::new(),
            rejected_orders: 0,
        }
    }

    /// Move to a new bar. Fills and marks use these closes until the next call.
    pub fn set_bar(&mut self, bar_index: usize, date: NaiveDate, prices: BTreeMap<String, f64>) {
        self.bar_index = bar_index;
        self.date = Some(date);
        self.prices = prices;
    }

    pub fn price(&self, instrument: &str) -> Result<f64, QuantsimError> {
        self.prices.get(instrument).copied().ok_or_else(|| {
            QuantsimError::configuration(
                instrument,
                format!("no close price at bar {}", self.bar_index),
            )
        })
    }

    pub fn buy(&mut self, instrument: &str, quantity: i64) -> Result<Option<Fill>, QuantsimError> {
        if quantity < 0 {
            return Err(QuantsimError::configuration(
                instrument,
                format!("buy quantity must be positive, got {}", quantity),
            ));
        }
        self.fill(instrument, quantity, true)
    }

    pub fn sell(&mut self, instrument: &str, quantity: i64) -> Result<Option<Fill>, QuantsimError> {
        if quantity < 0 {
            return Err(QuantsimError::configuration(
                instrument,
                format!("sell quantity must be positive, got {}", quantity),
            ));
        }
        self.fill(instrument, -quantity, true)
    }

    /// Flatten the position at the current close. Never subject to the funds check.
    pub fn close(&mut self, instrument: &str) -> Result<Option<Fill>, QuantsimError> {
        let size = self.account.position_size(instrument);
        self.fill(instrument, -size, false)
    }

    pub fn execute(&mut self, order: &Order) -> Result<Option<Fill>, QuantsimError> {
        match order.kind {
            OrderKind::Market { quantity } if quantity >= 0 => self.buy(&order.instrument, quantity),
            OrderKind::Market { quantity } => self.sell(&order.instrument, -quantity),
            OrderKind::Close => self.close(&order.instrument),
        }
    }

    fn fill(
        &mut self,
        instrument: &str,
        quantity: i64,
        check_funds: bool,
    ) -> Result<Option<Fill>, QuantsimError> {
        if quantity == 0 {
            return Ok(None);
        }
        let price = self.price(instrument)?;
        let date = self.date.ok_or_else(|| {
            QuantsimError::configuration(instrument, "order submitted before the first bar")
        })?;

        let cost = quantity as f64 * price;
        if check_funds && self.policy == FundsPolicy::Reject && quantity > 0 && cost > self.account.cash
        {
            self.rejected_orders += 1;
            warn!(
                instrument,
                quantity,
                price,
                cash = self.account.cash,
                bar = self.bar_index,
                "order rejected: insufficient funds"
            );
            return Err(QuantsimError::InsufficientFunds {
                instrument: instrument.to_string(),
                required: cost,
                available: self.account.cash,
            });
        }

        if let Some(trade) =
            self.account
                .apply_fill(instrument, quantity, price, self.bar_index, date)
        {
            debug!(
                instrument,
                pnl = trade.pnl,
                bars_held = trade.bars_held(),
                "trade closed"
            );
            self.closed_trades.push(trade);
        }
        debug!(
            instrument,
            quantity,
            price,
            cash = self.account.cash,
            bar = self.bar_index,
            "fill"
        );

        let fill = Fill {
            instrument: instrument.to_string(),
            quantity,
            price,
            bar_index: self.bar_index,
            date,
        };
        self.fills.push(fill.clone());
        Ok(Some(fill))
    }

    /// Current total equity at this bar's closes.
    pub fn equity(&self) -> f64 {
        self.account.total_equity(&self.prices)
    }

    /// Record this bar's equity. Calling twice for one bar is a no-op.
    pub fn mark_to_market(&mut self) -> f64 {
        let total_equity = self.equity();
        let already_marked = self
            .equity_curve
            .last()
            .is_some_and(|p| p.bar_index == self.bar_index);
        if !already_marked {
            if let Some(date) = self.date {
                self.equity_curve.push(EquityPoint {
                    bar_index: self.bar_index,
                    date,
                    total_equity,
                });
            }
        }
        total_equity
    }

    pub fn cash(&self) -> f64 {
        self.account.cash
    }

    pub fn starting_cash(&self) -> f64 {
        self.account.starting_cash
    }

    pub fn position_size(&self, instrument: &str) -> i64 {
        self.account.position_size(instrument)
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed_trades
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn rejected_orders(&self) -> usize {
        self.rejected_orders
    }
}
