use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    /// Failing fast until the cool-down elapses.
    Open,
    /// Letting trial calls through after the cool-down.
    HalfOpen,
}

struct BreakerCounters {
    state: CircuitState,
    consecutive_failures: usize,
    trial_successes: usize,
    opened_at: Option<Instant>,
}

/// Fails fast against an upstream that keeps erroring.
///
/// Only errors the caller classifies as upstream faults are counted, so a
/// request for an unknown ticker does not push the breaker open.
pub struct CircuitBreaker {
    counters: RwLock<BreakerCounters>,
    failure_threshold: usize,
    success_threshold: usize,
    cool_down: Duration,
    name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker [{name}] is open, retry in {retry_in:?}")]
    Open { name: String, retry_in: Duration },

    #[error(transparent)]
    Inner(E),
}

impl CircuitBreaker {
    pub fn new(
        name: impl Into<String>,
        failure_threshold: usize,
        success_threshold: usize,
        cool_down: Duration,
    ) -> Self {
        Self {
            counters: RwLock::new(BreakerCounters {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                trial_successes: 0,
                opened_at: None,
            }),
            failure_threshold: failure_threshold.max(1),
            success_threshold: success_threshold.max(1),
            cool_down,
            name: name.into(),
        }
    }

    /// Awaits `call` unless the circuit is open. `is_fault` decides whether an
    /// error counts against the upstream.
    pub async fn call<T, E, Fut>(
        &self,
        call: Fut,
        is_fault: impl Fn(&E) -> bool,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        if let Err(retry_in) = self.admit().await {
            return Err(CircuitBreakerError::Open {
                name: self.name.clone(),
                retry_in,
            });
        }

        match call.await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(e) => {
                if is_fault(&e) {
                    self.record_failure().await;
                } else {
                    self.record_success().await;
                }
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    /// Err carries the remaining cool-down.
    async fn admit(&self) -> Result<(), Duration> {
        let mut counters = self.counters.write().await;
        if counters.state != CircuitState::Open {
            return Ok(());
        }

        let elapsed = counters
            .opened_at
            .map(|at| at.elapsed())
            .unwrap_or(self.cool_down);
        if elapsed >= self.cool_down {
            info!(
                "CircuitBreaker [{}]: Open -> HalfOpen after {:?}",
                self.name, elapsed
            );
            counters.state = CircuitState::HalfOpen;
            counters.trial_successes = 0;
            Ok(())
        } else {
            Err(self.cool_down - elapsed)
        }
    }

    async fn record_success(&self) {
        let mut counters = self.counters.write().await;
        let state = counters.state;
        match state {
            CircuitState::HalfOpen => {
                counters.trial_successes += 1;
                if counters.trial_successes >= self.success_threshold {
                    info!(
                        "CircuitBreaker [{}]: HalfOpen -> Closed ({} successes)",
                        self.name, counters.trial_successes
                    );
                    counters.state = CircuitState::Closed;
                    counters.consecutive_failures = 0;
                    counters.trial_successes = 0;
                }
            }
            CircuitState::Closed => counters.consecutive_failures = 0,
            CircuitState::Open => {}
        }
    }

    async fn record_failure(&self) {
        let mut counters = self.counters.write().await;
        counters.consecutive_failures += 1;
        let state = counters.state;

        match state {
            CircuitState::Closed if counters.consecutive_failures >= self.failure_threshold => {
                error!(
                    "CircuitBreaker [{}]: Closed -> Open ({} consecutive failures)",
                    self.name, counters.consecutive_failures
                );
                counters.state = CircuitState::Open;
                counters.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                warn!(
                    "CircuitBreaker [{}]: HalfOpen -> Open (trial call failed)",
                    self.name
                );
                counters.state = CircuitState::Open;
                counters.opened_at = Some(Instant::now());
                counters.trial_successes = 0;
            }
            _ => {}
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.counters.read().await.state
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("failure_threshold", &self.failure_threshold)
            .field("cool_down", &self.cool_down)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always(_: &&str) -> bool {
        true
    }

    #[tokio::test]
    async fn test_circuit_opens_after_faults() {
        let cb = CircuitBreaker::new("test", 3, 2, Duration::from_secs(1));

        for _ in 0..3 {
            let result = cb.call(async { Err::<(), &str>("error") }, always).await;
            assert!(result.is_err());
        }
        assert_eq!(cb.state().await, CircuitState::Open);

        let result = cb.call(async { Ok::<(), &str>(()) }, always).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open { .. })));
    }

    #[tokio::test]
    async fn test_non_fault_errors_do_not_trip() {
        let cb = CircuitBreaker::new("test", 2, 1, Duration::from_secs(1));

        for _ in 0..5 {
            let result = cb
                .call(async { Err::<(), &str>("unknown ticker") }, |_| false)
                .await;
            assert!(matches!(result, Err(CircuitBreakerError::Inner(_))));
        }
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_circuit_recovers_after_cool_down() {
        let cb = CircuitBreaker::new("test", 2, 2, Duration::from_millis(100));
        for _ in 0..2 {
            let _ = cb.call(async { Err::<(), &str>("error") }, always).await;
        }
        assert_eq!(cb.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cb.call(async { Ok::<(), &str>(()) }, always).await.is_ok());
        assert_eq!(cb.state().await, CircuitState::HalfOpen);
        assert!(cb.call(async { Ok::<(), &str>(()) }, always).await.is_ok());
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_halfopen_reopens_on_fault() {
        let cb = CircuitBreaker::new("test", 2, 2, Duration::from_millis(100));
        for _ in 0..2 {
            let _ = cb.call(async { Err::<(), &str>("error") }, always).await;
        }
        tokio::time::sleep(Duration::from_millis(150)).await;

        let _ = cb.call(async { Err::<(), &str>("error") }, always).await;
        assert_eq!(cb.state().await, CircuitState::Open);
    }
}
