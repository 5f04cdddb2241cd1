//! Triple Exponential Moving Average.
//!
//! TEMA = 3*EMA1 - 3*EMA2 + EMA3, each EMA fed by the previous one.
//! Warmup: 3n-2 inputs.

use super::ema::Ema;

#[derive(Debug, Clone)]
pub struct Tema {
    ema1: Ema,
    ema2: Ema,
    ema3: Ema,
}

impl Tema {
    pub fn new(period: usize) -> Self {
        Tema {
            ema1: Ema::new(period),
            ema2: Ema::new(period),
            ema3: Ema::new(period),
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if let Some(e1) = self.ema1.update(value) {
            if let Some(e2) = self.ema2.update(e1) {
                self.ema3.update(e2);
            }
        }
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        match (self.ema1.value(), self.ema2.value(), self.ema3.value()) {
            (Some(e1), Some(e2), Some(e3)) => Some(3.0 * e1 - 3.0 * e2 + e3),
            _ => None,
        }
    }
}
