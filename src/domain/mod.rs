//! Core domain types and logic.

pub mod backtest;
pub mod channel;
pub mod config_validation;
pub mod drawdown;
pub mod error;
pub mod filter;
pub mod limits;
pub mod market_data;
pub mod metrics;
pub mod monitor;
pub mod ohlcv;
pub mod portfolio;
pub mod position;
pub mod signal;
pub mod sizing;
pub mod stops;
pub mod universe;
pub mod volatility;
