//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, or 50 when there was no movement at all.
//!
//! Warmup: first n inputs produce no value (n price changes need n+1 inputs).

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev: Option<f64>,
    changes: usize,
    gain_sum: f64,
    loss_sum: f64,
    averages: Option<(f64, f64)>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Rsi {
            period,
            prev: None,
            changes: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            averages: None,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        let prev = self.prev.replace(value)?;

        let change = value - prev;
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };
        let n = self.period as f64;

        self.averages = match self.averages {
            None => {
                self.changes += 1;
                self.gain_sum += gain;
                self.loss_sum += loss;
                (self.changes == self.period).then(|| (self.gain_sum / n, self.loss_sum / n))
            }
            Some((avg_gain, avg_loss)) => Some((
                (avg_gain * (n - 1.0) + gain) / n,
                (avg_loss * (n - 1.0) + loss) / n,
            )),
        };
        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        self.averages
            .map(|(avg_gain, avg_loss)| rsi_from_averages(avg_gain, avg_loss))
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
