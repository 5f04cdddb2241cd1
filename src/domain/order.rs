//! Orders emitted by strategies and consumed by the broker within one bar.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    /// Positive buys, negative sells.
    Market { quantity: i64 },
    /// Flatten whatever is held at fill time.
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub instrument: String,
    pub kind: OrderKind,
    pub bar_index: usize,
}

impl Order {
    pub fn buy(instrument: &str, quantity: i64, bar_index: usize) -> Self {
        Order {
            instrument: instrument.to_string(),
            kind: OrderKind::Market {
                quantity: quantity.abs(),
            },
            bar_index,
        }
    }

    pub fn sell(instrument: &str, quantity: i64, bar_index: usize) -> Self {
        Order {
            instrument: instrument.to_string(),
            kind: OrderKind::Market {
                quantity: -quantity.abs(),
            },
            bar_index,
        }
    }

    pub fn close(instrument: &str, bar_index: usize) -> Self {
        Order {
            instrument: instrument.to_string(),
            kind: OrderKind::Close,
            bar_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_and_sell_signs() {
        assert_eq!(Order::buy("SPY", 5, 0).kind, OrderKind::Market { quantity: 5 });
        assert_eq!(Order::sell("SPY", 5, 0).kind, OrderKind::Market { quantity: -5 });
        assert_eq!(Order::sell("SPY", -5, 0).kind, OrderKind::Market { quantity: -5 });
    }

    #[test]
    fn close_carries_bar_index() {
        let order = Order::close("SPY", 7);
        assert_eq!(order.kind, OrderKind::Close);
        assert_eq!(order.bar_index, 7);
    }
}
