//! Per-symbol result cache with TTL staleness and single-flight computation.

pub mod result_cache;

pub use result_cache::{CacheEntry, CacheKey, MIN_SWEEP_INTERVAL, ResultCache, is_stale};
