//! Simple Moving Average.
//!
//! Arithmetic mean of the last n inputs, kept as a ring buffer plus running sum.
//! Warmup: first (n-1) inputs produce no value.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Sma {
            period,
            window: VecDeque::new(),
            sum: 0.0,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        self.window.push_back(value);
        self.sum += value;
        if self.window.len() > self.period {
            if let Some(old) = self.window.pop_front() {
                self.sum -= old;
            }
        }
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        (self.period > 0 && self.window.len() == self.period)
            .then(|| self.sum / self.period as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_warmup() {
        let mut sma = Sma::new(3);
        assert_eq!(sma.update(10.0), None);
        assert_eq!(sma.update(20.0), None);
        assert_eq!(sma.update(30.0), Some(20.0));
    }

    #[test]
    fn sma_slides_window() {
        let mut sma = Sma::new(3);
        for v in [10.0, 20.0, 30.0, 40.0] {
            sma.update(v);
        }
        assert!((sma.value().unwrap() - 30.0).abs() < f64::EPSILON);
        sma.update(50.0);
        assert!((sma.value().unwrap() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sma_period_1_tracks_input() {
        let mut sma = Sma::new(1);
        assert_eq!(sma.update(7.0), Some(7.0));
        assert_eq!(sma.update(9.0), Some(9.0));
    }

    #[test]
    fn huge_period_allocates_lazily() {
        let mut sma = Sma::new(10_000_000_000_000);
        assert_eq!(sma.update(7.0), None);
        assert_eq!(sma.update(8.0), None);
    }

    #[test]
    fn sma_period_0_never_ready() {
        let mut sma = Sma::new(0);
        assert_eq!(sma.update(7.0), None);
        assert_eq!(sma.value(), None);
    }

    #[test]
    fn sma_handles_negative_inputs() {
        let mut sma = Sma::new(2);
        sma.update(-4.0);
        assert_eq!(sma.update(2.0), Some(-1.0));
    }
}
