//! Fixed-window admission control.
//!
//! # Responsibilities
//! - Bound admitted requests per mapping to `rate_limit_per_second` within
//!   each clock-aligned 1-second window
//! - Stay correct under concurrent invocations racing on the same key
//!
//! # Design Decisions
//! - The counter lives in the StateStore under `rate:<match_key>`; a stale
//!   window is replaced, never incremented across windows
//! - Denial is a post-check on the incremented count, not a rollback: the
//!   job is to bound admitted traffic, not to produce an exact count
//! - Lost CAS races retry up to a small bound, then fail closed so tail
//!   latency stays bounded on a hot key
//! - A store outage follows the configured policy (default fail open) and
//!   is logged and counted as degraded operation

use serde::{Deserialize, Serialize};

use crate::config::OutagePolicy;
use crate::observability::metrics;
use crate::resilience::{epoch_ms, MAX_CAS_ATTEMPTS};
use crate::store::StateStore;

/// Persisted window record at `rate:<match_key>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RateLimitState {
    window_start_ms: u64,
    count: u32,
}

/// Fixed-window rate limiter over the shared state store.
#[derive(Clone)]
pub struct RateLimiter<S> {
    store: S,
    on_outage: OutagePolicy,
}

impl<S: StateStore> RateLimiter<S> {
    pub fn new(store: S, on_outage: OutagePolicy) -> Self {
        Self { store, on_outage }
    }

    /// Count this request against the current window and report whether it
    /// is admitted. The increment lands even when the answer is "deny".
    pub async fn check_and_increment(&self, match_key: &str, limit_per_second: u32) -> bool {
        self.check_at(match_key, limit_per_second, epoch_ms()).await
    }

    async fn outage(&self, match_key: &str) -> bool {
        metrics::record_store_degraded("rate_limiter");
        match self.on_outage {
            OutagePolicy::FailOpen => {
                tracing::warn!(match_key, "State store unreachable, admitting (fail open)");
                true
            }
            OutagePolicy::FailClosed => {
                tracing::warn!(match_key, "State store unreachable, rejecting (fail closed)");
                false
            }
        }
    }

    pub(crate) async fn check_at(&self, match_key: &str, limit_per_second: u32, now_ms: u64) -> bool {
        let key = format!("rate:{match_key}");
        let window = now_ms - now_ms % 1000;

        for _ in 0..MAX_CAS_ATTEMPTS {
            let record = match self.store.get(&key).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(match_key, error = %e, "Rate limit state read failed");
                    return self.outage(match_key).await;
                }
            };

            let (version, state) = match record {
                Some(v) => (
                    v.version,
                    serde_json::from_value::<RateLimitState>(v.value).ok(),
                ),
                None => (0, None),
            };

            // Any record whose window is not the current one is stale and
            // gets replaced; counts never carry across windows.
            let next = match state {
                Some(s) if s.window_start_ms == window => RateLimitState {
                    window_start_ms: window,
                    count: s.count.saturating_add(1),
                },
                _ => RateLimitState {
                    window_start_ms: window,
                    count: 1,
                },
            };
            let allowed = next.count <= limit_per_second;

            let value = serde_json::to_value(&next).expect("window record serializes");
            match self.store.compare_and_swap(&key, version, value).await {
                Ok(true) => {
                    if !allowed {
                        tracing::debug!(match_key, count = next.count, limit = limit_per_second, "Over limit");
                    }
                    return allowed;
                }
                Ok(false) => continue, // concurrent writer won; re-read
                Err(e) => {
                    tracing::warn!(match_key, error = %e, "Rate limit state write failed");
                    return self.outage(match_key).await;
                }
            }
        }

        tracing::warn!(match_key, "Rate limit CAS contention exhausted, rejecting");
        false
    }
}
