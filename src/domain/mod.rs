// Market data domain
pub mod market;

// Equity-curve statistics
pub mod performance;

// Port interfaces
pub mod ports;

// Prediction and backtest payloads
pub mod results;

// Domain-specific error types
pub mod errors;
