// Equity-curve statistics
pub mod metrics;
pub mod stats;
