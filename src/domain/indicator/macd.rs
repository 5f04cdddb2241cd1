//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 inputs produce no value.

use super::ema::Ema;
use super::IndicatorValue;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    line: Option<f64>,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Macd {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
            line: None,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<IndicatorValue> {
        let fast = self.fast.update(value);
        let slow = self.slow.update(value);
        if let (Some(f), Some(s)) = (fast, slow) {
            let line = f - s;
            self.line = Some(line);
            self.signal.update(line);
        }
        self.value()
    }

    pub fn value(&self) -> Option<IndicatorValue> {
        let line = self.line?;
        let signal = self.signal.value()?;
        Some(IndicatorValue::Macd {
            line,
            signal,
            histogram: line - signal,
        })
    }
}

impl Default for Macd {
    fn default() -> Self {
        Macd::new(DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn macd_warmup_default() {
        let mut macd = Macd::default();
        let out: Vec<_> = ramp(40).into_iter().map(|p| macd.update(p)).collect();

        let warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;
        for (i, v) in out.iter().enumerate().take(warmup) {
            assert!(v.is_none(), "Index {} should not be valid", i);
        }
        assert!(out[warmup].is_some(), "Index {} should be valid", warmup);
    }

    #[test]
    fn macd_histogram_equals_line_minus_signal() {
        let mut macd = Macd::new(3, 6, 4);
        for p in ramp(30) {
            if let Some(IndicatorValue::Macd {
                line,
                signal,
                histogram,
            }) = macd.update(p)
            {
                assert!((histogram - (line - signal)).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn macd_line_is_ema_fast_minus_ema_slow() {
        let prices = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0];
        let mut macd = Macd::new(3, 5, 2);
        let mut fast = Ema::new(3);
        let mut slow = Ema::new(5);

        for (i, &p) in prices.iter().enumerate() {
            let out = macd.update(p);
            let f = fast.update(p);
            let s = slow.update(p);
            if let Some(IndicatorValue::Macd { line, .. }) = out {
                let expected = f.unwrap() - s.unwrap();
                assert!(
                    (line - expected).abs() < f64::EPSILON,
                    "MACD line mismatch at index {}",
                    i
                );
            }
        }
    }

    #[test]
    fn macd_positive_on_uptrend() {
        let mut macd = Macd::new(5, 10, 3);
        let mut last = None;
        for p in ramp(40) {
            last = macd.update(p);
        }
        match last {
            Some(IndicatorValue::Macd { line, .. }) => assert!(line > 0.0),
            other => panic!("expected MACD value, got {other:?}"),
        }
    }

    #[test]
    fn macd_custom_parameters() {
        let mut macd = Macd::new(5, 10, 3);
        let out: Vec<_> = ramp(20).into_iter().map(|p| macd.update(p)).collect();
        let warmup = 10 - 1 + 3 - 1;
        assert!(out[warmup - 1].is_none());
        assert!(out[warmup].is_some());
    }

    #[test]
    fn macd_zero_period_never_ready() {
        let mut macd = Macd::new(12, 0, 9);
        for p in ramp(50) {
            assert!(macd.update(p).is_none());
        }
    }
}
