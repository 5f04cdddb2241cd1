//! Core simulation: data, indicators, broker, strategies, scheduler, analytics.

pub mod account;
pub mod analytics;
pub mod bar_series;
pub mod broker;
pub mod config;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod order;
pub mod position;
pub mod scheduler;
pub mod strategy;
pub mod sweep;
