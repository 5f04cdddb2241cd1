//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) inputs produce no value.

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: f64,
    seen: usize,
    seed_sum: f64,
    current: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Ema {
            period,
            k: 2.0 / (period as f64 + 1.0),
            seen: 0,
            seed_sum: 0.0,
            current: None,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        self.seen += 1;
        self.current = match self.current {
            None => {
                self.seed_sum += value;
                (self.seen == self.period).then(|| self.seed_sum / self.period as f64)
            }
            Some(prev) => Some(value * self.k + prev * (1.0 - self.k)),
        };
        self.current
    }

    pub fn value(&self) -> Option<f64> {
        self.current
    }
}
