#![allow(dead_code)]

use chrono::NaiveDate;
use quantsim::domain::bar_series::BarSeries;
use quantsim::domain::error::QuantsimError;
pub use quantsim::domain::ohlcv::Bar;
use quantsim::domain::strategy::StrategyConfig;
use quantsim::ports::data_port::MarketDataSource;
use std::collections::BTreeMap;
use std::path::Path;

pub struct MockDataSource {
    pub data: BTreeMap<String, Vec<Bar>>,
    pub errors: BTreeMap<String, String>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_bars(mut self, instrument: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(instrument.to_string(), bars);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors.insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl MarketDataSource for MockDataSource {
    fn fetch_series(&self, instrument: &str) -> Result<BarSeries, QuantsimError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(QuantsimError::DataSource {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(instrument).cloned().unwrap_or_default();
        BarSeries::new(instrument, bars)
    }
}

pub fn date(offset: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset as i64)
}

pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::flat(date(i), c, 10_000))
        .collect()
}

pub fn series(instrument: &str, closes: &[f64]) -> BarSeries {
    BarSeries::new(instrument, make_bars(closes)).unwrap()
}

pub fn strategy(kind: &str, params: &[(&str, &str)]) -> StrategyConfig {
    let raw: BTreeMap<String, String> = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    StrategyConfig::from_params(kind, &raw).unwrap()
}

pub fn write_csv(dir: &Path, instrument: &str, closes: &[f64]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for bar in make_bars(closes) {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.date.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    std::fs::write(dir.join(format!("{}.csv", instrument)), content).unwrap();
}

/// A=150, B=100 throughout, except A=160 at bar 25.
pub fn arbitrage_closes(len: usize) -> (Vec<f64>, Vec<f64>) {
    let a = (0..len).map(|i| if i == 25 { 160.0 } else { 150.0 }).collect();
    let b = vec![100.0; len];
    (a, b)
}

/// 100 + i for bars 0..15, then 91 from bar 15 on.
pub fn stop_loss_closes(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| if i < 15 { 100.0 + i as f64 } else { 91.0 })
        .collect()
}
