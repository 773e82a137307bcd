//! Policy-driven trading simulation over feature windows.

pub mod action_mapping;
pub mod backtest;
pub mod prediction;
pub mod rollout;

pub use action_mapping::{ActionMapping, TradingAccount};
pub use backtest::BacktestSimulator;
pub use prediction::NextDayPredictor;
pub use rollout::{Rollout, replay};
