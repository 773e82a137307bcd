// Observation building from daily bars
pub mod feature_builder;
pub mod indicators;

pub use feature_builder::{
    FeatureBuilder, INDICATOR_NAMES, MarketFeatures, OBSERVATION_DIM, STOCK_DIM, WARMUP_BARS,
};
