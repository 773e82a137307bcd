use crate::domain::errors::{InsightError, InsightResult};
use crate::domain::ports::TradingPolicy;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

type PolicyLoader = Box<dyn Fn() -> InsightResult<Arc<dyn TradingPolicy>> + Send + Sync>;

/// Process-wide handle to the trading policy.
///
/// Lifecycle: the artifact is loaded at most once successfully and then kept
/// for the life of the process; it is never reloaded. A failed load is not
/// memoized, so the next `get` tries again (the artifact may be deployed
/// out-of-band after startup).
pub struct PolicyHandle {
    loaded: Mutex<Option<Arc<dyn TradingPolicy>>>,
    loader: PolicyLoader,
}

impl PolicyHandle {
    /// Handle that loads on first use.
    pub fn lazy<F>(loader: F) -> Self
    where
        F: Fn() -> InsightResult<Arc<dyn TradingPolicy>> + Send + Sync + 'static,
    {
        Self {
            loaded: Mutex::new(None),
            loader: Box::new(loader),
        }
    }

    /// Handle around an already constructed policy.
    pub fn ready(policy: Arc<dyn TradingPolicy>) -> Self {
        Self {
            loaded: Mutex::new(Some(policy)),
            loader: Box::new(|| {
                Err(InsightError::ModelUnavailable(
                    "policy handle has no loader".to_string(),
                ))
            }),
        }
    }

    /// Returns the policy, loading it if this is the first successful call.
    pub fn get(&self) -> InsightResult<Arc<dyn TradingPolicy>> {
        let mut guard = self
            .loaded
            .lock()
            .map_err(|e| InsightError::Internal(format!("policy lock poisoned: {}", e)))?;

        if let Some(policy) = guard.as_ref() {
            return Ok(Arc::clone(policy));
        }

        match (self.loader)() {
            Ok(policy) => {
                info!(
                    "PolicyHandle: loaded policy '{}' (observation dim {})",
                    policy.name(),
                    policy.observation_dim()
                );
                *guard = Some(Arc::clone(&policy));
                Ok(policy)
            }
            Err(e) => {
                warn!("PolicyHandle: policy load failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.lock().map(|g| g.is_some()).unwrap_or(false)
    }
}

impl std::fmt::Debug for PolicyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyHandle")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
