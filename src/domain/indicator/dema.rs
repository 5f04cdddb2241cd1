//! Double Exponential Moving Average.
//!
//! DEMA = 2*EMA1 - EMA2, where EMA2 is the EMA of EMA1 over the same period.
//! EMA2 only sees EMA1 readings once EMA1 is seeded, so warmup is 2n-1 inputs.

use super::ema::Ema;

#[derive(Debug, Clone)]
pub struct Dema {
    ema1: Ema,
    ema2: Ema,
}

impl Dema {
    pub fn new(period: usize) -> Self {
        Dema {
            ema1: Ema::new(period),
            ema2: Ema::new(period),
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if let Some(e1) = self.ema1.update(value) {
            self.ema2.update(e1);
        }
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        match (self.ema1.value(), self.ema2.value()) {
            (Some(e1), Some(e2)) => Some(2.0 * e1 - e2),
            _ => None,
        }
    }
}
