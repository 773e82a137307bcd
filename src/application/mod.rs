// Service wiring
pub mod bootstrap;

// Per-symbol result cache
pub mod cache;

// Request orchestration
pub mod insight_service;

// Observation building from daily bars
pub mod market_data;

// Policy inference
pub mod ml;

// Policy replay, backtests and predictions
pub mod simulation;
