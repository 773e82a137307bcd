use crate::domain::errors::{InsightError, InsightResult};
use crate::domain::ports::Clock;
use crate::domain::results::{InsightPayload, ResultKind};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Flight = Shared<BoxFuture<'static, InsightResult<InsightPayload>>>;

/// Lower bound for the sweeper period. A zero TTL disables caching but the
/// map still needs sweeping.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub kind: ResultKind,
}

impl CacheKey {
    pub fn new(symbol: &str, kind: ResultKind) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub symbol: String,
    pub kind: ResultKind,
    /// When the computation finished.
    pub computed_at: DateTime<Utc>,
    pub payload: InsightPayload,
}

/// True once an entry is at least `ttl` old. Entries stamped in the future
/// count as fresh.
pub fn is_stale(entry: &CacheEntry, now: DateTime<Utc>, ttl: Duration) -> bool {
    match (now - entry.computed_at).to_std() {
        Ok(age) => age >= ttl,
        Err(_) => false,
    }
}

enum Slot {
    Ready(CacheEntry),
    Pending { flight_id: u64, flight: Flight },
}

impl Slot {
    fn is_flight(&self, id: u64) -> bool {
        matches!(self, Slot::Pending { flight_id, .. } if *flight_id == id)
    }
}

enum Lookup {
    Hit(InsightPayload),
    Join(Flight),
    Miss,
}

struct Inner {
    slots: DashMap<CacheKey, Slot>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    next_flight: AtomicU64,
}

impl Inner {
    /// Publishes the outcome of flight `flight_id`. Success replaces the
    /// pending slot with a fresh entry, failure leaves the key absent. A slot
    /// that no longer belongs to this flight is left alone.
    fn settle(&self, key: &CacheKey, flight_id: u64, outcome: &InsightResult<InsightPayload>) {
        match outcome {
            Ok(payload) => {
                if let Some(mut slot) = self.slots.get_mut(key) {
                    if slot.is_flight(flight_id) {
                        *slot = Slot::Ready(CacheEntry {
                            symbol: key.symbol.clone(),
                            kind: key.kind,
                            computed_at: self.clock.now(),
                            payload: payload.clone(),
                        });
                    }
                }
            }
            Err(e) => {
                warn!(
                    "ResultCache: {} computation for {} failed: {}",
                    key.kind, key.symbol, e
                );
                self.slots.remove_if(key, |_, slot| slot.is_flight(flight_id));
            }
        }
    }

    fn purge_stale(&self) -> usize {
        let now = self.clock.now();
        let before = self.slots.len();
        self.slots.retain(|_, slot| match slot {
            Slot::Ready(entry) => !is_stale(entry, now, self.ttl),
            Slot::Pending { .. } => true,
        });
        before.saturating_sub(self.slots.len())
    }
}

/// Shared cache of computed predictions and backtests, keyed by
/// `(symbol, kind)`. Cloning shares the same underlying map.
#[derive(Clone)]
pub struct ResultCache {
    inner: Arc<Inner>,
}

impl ResultCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: DashMap::new(),
                ttl,
                clock,
                next_flight: AtomicU64::new(0),
            }),
        }
    }

    /// Sweeper period matching the TTL, never shorter than `MIN_SWEEP_INTERVAL`.
    pub fn sweep_interval(&self) -> Duration {
        self.inner.ttl.max(MIN_SWEEP_INTERVAL)
    }

    /// Fresh payload for the key, if any. Never starts a computation.
    pub fn get(&self, symbol: &str, kind: ResultKind) -> Option<InsightPayload> {
        let key = CacheKey::new(symbol, kind);
        let slot = self.inner.slots.get(&key)?;
        match slot.value() {
            Slot::Ready(entry) if !is_stale(entry, self.inner.clock.now(), self.inner.ttl) => {
                Some(entry.payload.clone())
            }
            _ => None,
        }
    }

    /// Returns the fresh payload for the key, or joins the computation in
    /// flight, or starts one with `compute`. `compute` runs at most once per
    /// missing or stale key no matter how many callers arrive concurrently.
    /// Every waiter of a flight observes the same outcome.
    pub async fn get_or_compute<F, Fut>(
        &self,
        symbol: &str,
        kind: ResultKind,
        compute: F,
    ) -> InsightResult<InsightPayload>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = InsightResult<InsightPayload>> + Send + 'static,
    {
        let key = CacheKey::new(symbol, kind);
        let now = self.inner.clock.now();

        // The shard lock is released at the end of this block, before awaiting.
        let flight = match self.inner.slots.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let lookup = match occupied.get() {
                    Slot::Ready(entry) if !is_stale(entry, now, self.inner.ttl) => {
                        Lookup::Hit(entry.payload.clone())
                    }
                    Slot::Ready(_) => Lookup::Miss,
                    Slot::Pending { flight, .. } => Lookup::Join(flight.clone()),
                };
                match lookup {
                    Lookup::Hit(payload) => {
                        debug!("ResultCache: hit for {} {}", kind, symbol);
                        return Ok(payload);
                    }
                    Lookup::Join(flight) => {
                        debug!("ResultCache: joining in-flight {} for {}", kind, symbol);
                        flight
                    }
                    Lookup::Miss => {
                        debug!("ResultCache: stale {} for {}, recomputing", kind, symbol);
                        let (flight_id, flight) = self.launch(key, compute);
                        occupied.insert(Slot::Pending {
                            flight_id,
                            flight: flight.clone(),
                        });
                        flight
                    }
                }
            }
            Entry::Vacant(vacant) => {
                debug!("ResultCache: miss for {} {}", kind, symbol);
                let (flight_id, flight) = self.launch(key, compute);
                vacant.insert(Slot::Pending {
                    flight_id,
                    flight: flight.clone(),
                });
                flight
            }
        };

        flight.await
    }

    /// Spawns the computation so it runs to completion even when every
    /// waiter goes away. The task settles the slot itself.
    fn launch<F, Fut>(&self, key: CacheKey, compute: F) -> (u64, Flight)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = InsightResult<InsightPayload>> + Send + 'static,
    {
        let flight_id = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
        let inner = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(async move { compute().await })
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(InsightError::Internal(format!(
                    "{} computation for {} panicked",
                    key.kind, key.symbol
                ))),
            };
            inner.settle(&key, flight_id, &outcome);
            outcome
        });

        let flight = async move {
            task.await.unwrap_or_else(|e| {
                Err(InsightError::Internal(format!(
                    "cache computation task failed: {}",
                    e
                )))
            })
        }
        .boxed()
        .shared();

        (flight_id, flight)
    }

    /// Drops every stale entry. In-flight computations are kept.
    pub fn purge_stale(&self) -> usize {
        self.inner.purge_stale()
    }

    /// Periodically purges stale entries. Stops once the cache is dropped.
    /// A zero period is raised to `MIN_SWEEP_INTERVAL`.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let every = if every.is_zero() {
                MIN_SWEEP_INTERVAL
            } else {
                every
            };
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    debug!("ResultCache: sweeper stopping, cache dropped");
                    break;
                };
                let removed = inner.purge_stale();
                if removed > 0 {
                    info!("ResultCache: swept {} stale entries", removed);
                }
            }
        })
    }

    /// Number of slots, in-flight computations included.
    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.inner.ttl)
            .field("entries", &self.inner.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::results::PredictionResult;
    use crate::infrastructure::mock::ManualClock;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicUsize;

    fn payload(symbol: &str, close: f64) -> InsightPayload {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        PredictionResult {
            symbol: symbol.to_string(),
            latest_close: close,
            predicted_next_close: close,
            delta: 0.0,
            delta_pct: 0.0,
            generated_at: at,
            price_history: Vec::new(),
            prediction_point: crate::domain::results::PredictionPoint {
                date: at,
                predicted_close: close,
            },
        }
        .into()
    }

    fn entry_at(computed_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            symbol: "AAPL".to_string(),
            kind: ResultKind::Prediction,
            computed_at,
            payload: payload("AAPL", 1.0),
        }
    }

    #[test]
    fn test_is_stale_boundaries() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let ttl = Duration::from_secs(3600);
        let entry = entry_at(t0);

        assert!(!is_stale(&entry, t0, ttl));
        assert!(!is_stale(&entry, t0 + chrono::Duration::minutes(59), ttl));
        assert!(is_stale(&entry, t0 + chrono::Duration::minutes(60), ttl));
        assert!(!is_stale(&entry, t0 - chrono::Duration::minutes(5), ttl));
    }

    #[tokio::test]
    async fn test_get_does_not_compute() {
        let clock = Arc::new(ManualClock::default());
        let cache = ResultCache::new(Duration::from_secs(60), clock);
        assert!(cache.get("AAPL", ResultKind::Prediction).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_kinds_are_cached_separately() {
        let clock = Arc::new(ManualClock::default());
        let cache = ResultCache::new(Duration::from_secs(60), clock);
        let calls = Arc::new(AtomicUsize::new(0));

        for kind in [ResultKind::Prediction, ResultKind::Backtest] {
            let calls = calls.clone();
            cache
                .get_or_compute("AAPL", kind, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(payload("AAPL", 1.0))
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_purge_keeps_fresh_entries() {
        let clock = Arc::new(ManualClock::default());
        let cache = ResultCache::new(Duration::from_secs(60), clock.clone());

        cache
            .get_or_compute("OLD", ResultKind::Prediction, || async {
                Ok(payload("OLD", 1.0))
            })
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(45));
        cache
            .get_or_compute("NEW", ResultKind::Prediction, || async {
                Ok(payload("NEW", 2.0))
            })
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(30));

        assert_eq!(cache.purge_stale(), 1);
        assert!(cache.get("OLD", ResultKind::Prediction).is_none());
        assert!(cache.get("NEW", ResultKind::Prediction).is_some());
    }

    #[tokio::test]
    async fn test_panicking_compute_is_reported_and_cleared() {
        let clock = Arc::new(ManualClock::default());
        let cache = ResultCache::new(Duration::from_secs(60), clock);

        let err = cache
            .get_or_compute("BOOM", ResultKind::Backtest, || async {
                if cfg!(test) {
                    panic!("compute exploded");
                }
                Ok(payload("BOOM", 0.0))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, InsightError::Internal(_)));
        assert!(cache.is_empty());
    }
}
