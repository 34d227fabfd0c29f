//! Circuit breaker keyed per mapping.
//!
//! # States
//! - Closed: forward normally (`open_since` absent)
//! - Open: reject without contacting the upstream (`open_since` present,
//!   cooldown not elapsed)
//! - Half-open: cooldown elapsed, the next request runs as a trial
//!
//! # State Transitions
//! ```text
//! Closed → Open: errors reaches error_threshold
//! Open → Half-open: cooldown_seconds elapsed since open_since
//! Half-open → Closed: trial succeeds (errors reset, open_since cleared)
//! Half-open → Open: trial fails (open_since re-armed to now)
//! ```
//!
//! # Design Decisions
//! - No persisted in-flight-trial flag: concurrent observers of an elapsed
//!   cooldown all forward, an accepted race
//! - Rejecting while open mutates nothing, so rejected traffic cannot
//!   inflate the error count
//! - A non-2xx status, transport error, timeout, or over-latency response
//!   all count as the same kind of failure
//! - A lost CAS race on recording is dropped after a few attempts; the
//!   next outcome re-attempts the same transition

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::{epoch_ms, MAX_CAS_ATTEMPTS};
use crate::store::StateStore;

/// What the handler should do with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerDecision {
    Forward,
    Reject,
}

/// The result of one forwarded (or failed) upstream call.
#[derive(Debug, Clone, Copy)]
pub struct Outcome {
    /// Final response had a 2xx status.
    pub success: bool,
    /// Wall time of the upstream call, redirects included.
    pub latency: Duration,
}

/// Persisted record at `breaker:<match_key>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BreakerState {
    errors: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    open_since: Option<u64>,
}

/// Failure-tracking state machine over the shared state store.
#[derive(Clone)]
pub struct CircuitBreaker<S> {
    store: S,
}

impl<S: StateStore> CircuitBreaker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Decide whether to forward. Never mutates state: an open breaker is
    /// observed, not counted against.
    pub async fn check(&self, match_key: &str, config: &BreakerConfig) -> BreakerDecision {
        self.check_at(match_key, config, epoch_ms()).await
    }

    pub(crate) async fn check_at(
        &self,
        match_key: &str,
        config: &BreakerConfig,
        now_ms: u64,
    ) -> BreakerDecision {
        let key = format!("breaker:{match_key}");
        let state = match self.store.get(&key).await {
            Ok(Some(v)) => serde_json::from_value::<BreakerState>(v.value).unwrap_or_default(),
            Ok(None) => return BreakerDecision::Forward,
            Err(e) => {
                // Without readable state the breaker cannot protect anyone;
                // forward and surface the degradation.
                tracing::warn!(match_key, error = %e, "Breaker state read failed, forwarding");
                metrics::record_store_degraded("breaker");
                return BreakerDecision::Forward;
            }
        };

        match state.open_since {
            Some(open_since)
                if now_ms.saturating_sub(open_since) < config.cooldown_seconds.saturating_mul(1000) =>
            {
                BreakerDecision::Reject
            }
            // Cooldown elapsed: this call is the half-open trial.
            Some(_) => BreakerDecision::Forward,
            None => BreakerDecision::Forward,
        }
    }

    /// Record the outcome of a forwarded call, opening, re-arming, or
    /// closing the breaker as needed.
    pub async fn record_outcome(&self, match_key: &str, outcome: Outcome, config: &BreakerConfig) {
        self.record_at(match_key, outcome, config, epoch_ms()).await;
    }

    pub(crate) async fn record_at(
        &self,
        match_key: &str,
        outcome: Outcome,
        config: &BreakerConfig,
        now_ms: u64,
    ) {
        let failure = !outcome.success || outcome.latency.as_millis() as u64 > config.latency_ms;
        let key = format!("breaker:{match_key}");

        for _ in 0..MAX_CAS_ATTEMPTS {
            let record = match self.store.get(&key).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(match_key, error = %e, "Breaker state read failed, outcome dropped");
                    metrics::record_store_degraded("breaker");
                    return;
                }
            };

            let (version, state) = match record {
                Some(v) => (
                    v.version,
                    serde_json::from_value::<BreakerState>(v.value).unwrap_or_default(),
                ),
                None => (0, BreakerState::default()),
            };

            let next = if failure {
                let errors = state.errors.saturating_add(1);
                BreakerState {
                    errors,
                    // Opens on threshold, and re-arms the cooldown when a
                    // half-open trial fails.
                    open_since: if errors >= config.error_threshold {
                        Some(now_ms)
                    } else {
                        state.open_since
                    },
                }
            } else {
                if state.errors == 0 && state.open_since.is_none() {
                    return; // already closed and clean
                }
                BreakerState {
                    errors: 0,
                    open_since: None,
                }
            };

            let value = serde_json::to_value(&next).expect("breaker record serializes");
            match self.store.compare_and_swap(&key, version, value).await {
                Ok(true) => {
                    if next.open_since.is_some() && state.open_since.is_none() {
                        tracing::warn!(match_key, errors = next.errors, "Circuit opened");
                        metrics::record_breaker_transition(match_key, "open");
                    } else if next.open_since.is_none() && state.open_since.is_some() {
                        tracing::info!(match_key, "Circuit closed after successful trial");
                        metrics::record_breaker_transition(match_key, "closed");
                    }
                    return;
                }
                Ok(false) => continue,
                Err(e) => {
                    tracing::warn!(match_key, error = %e, "Breaker state write failed, outcome dropped");
                    metrics::record_store_degraded("breaker");
                    return;
                }
            }
        }

        // Lost every race; the next outcome will re-attempt this transition.
        tracing::debug!(match_key, "Breaker outcome dropped after CAS contention");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const NOW: u64 = 1_700_000_000_000;

    fn config() -> BreakerConfig {
        BreakerConfig {
            error_threshold: 2,
            latency_ms: 1_000,
            cooldown_seconds: 1,
        }
    }

    fn breaker() -> CircuitBreaker<MemoryStore> {
        CircuitBreaker::new(MemoryStore::new())
    }

    fn ok(latency_ms: u64) -> Outcome {
        Outcome {
            success: true,
            latency: Duration::from_millis(latency_ms),
        }
    }

    fn fail() -> Outcome {
        Outcome {
            success: false,
            latency: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn fresh_breaker_forwards() {
        let cb = breaker();
        assert_eq!(cb.check_at("/api", &config(), NOW).await, BreakerDecision::Forward);
    }

    #[tokio::test]
    async fn opens_at_threshold_and_rejects_within_cooldown() {
        let cb = breaker();
        let cfg = config();

        cb.record_at("/api", fail(), &cfg, NOW).await;
        assert_eq!(cb.check_at("/api", &cfg, NOW).await, BreakerDecision::Forward);

        cb.record_at("/api", fail(), &cfg, NOW).await;
        assert_eq!(cb.check_at("/api", &cfg, NOW + 100).await, BreakerDecision::Reject);
        assert_eq!(cb.check_at("/api", &cfg, NOW + 999).await, BreakerDecision::Reject);
    }

    #[tokio::test]
    async fn extreme_cooldown_never_overflows() {
        let cb = breaker();
        let cfg = BreakerConfig {
            cooldown_seconds: u64::MAX,
            ..config()
        };

        cb.record_at("/api", fail(), &cfg, NOW).await;
        cb.record_at("/api", fail(), &cfg, NOW).await;
        assert_eq!(
            cb.check_at("/api", &cfg, u64::MAX).await,
            BreakerDecision::Reject
        );
    }

    #[tokio::test]
    async fn cooldown_elapsed_allows_trial() {
        let cb = breaker();
        let cfg = config();
        cb.record_at("/api", fail(), &cfg, NOW).await;
        cb.record_at("/api", fail(), &cfg, NOW).await;

        assert_eq!(cb.check_at("/api", &cfg, NOW + 1000).await, BreakerDecision::Forward);
    }

    #[tokio::test]
    async fn successful_trial_closes_and_resets() {
        let cb = breaker();
        let cfg = config();
        cb.record_at("/api", fail(), &cfg, NOW).await;
        cb.record_at("/api", fail(), &cfg, NOW).await;

        cb.record_at("/api", ok(10), &cfg, NOW + 1100).await;
        assert_eq!(cb.check_at("/api", &cfg, NOW + 1200).await, BreakerDecision::Forward);

        // Closed state survives another single failure below the threshold.
        cb.record_at("/api", fail(), &cfg, NOW + 1300).await;
        assert_eq!(cb.check_at("/api", &cfg, NOW + 1400).await, BreakerDecision::Forward);
    }

    #[tokio::test]
    async fn failed_trial_rearms_cooldown() {
        let cb = breaker();
        let cfg = config();
        cb.record_at("/api", fail(), &cfg, NOW).await;
        cb.record_at("/api", fail(), &cfg, NOW).await;

        // Trial at NOW+1500 fails: open_since moves forward.
        cb.record_at("/api", fail(), &cfg, NOW + 1500).await;
        assert_eq!(cb.check_at("/api", &cfg, NOW + 2000).await, BreakerDecision::Reject);
        assert_eq!(cb.check_at("/api", &cfg, NOW + 2500).await, BreakerDecision::Forward);
    }

    #[tokio::test]
    async fn slow_success_counts_as_failure() {
        let cb = breaker();
        let cfg = config();

        cb.record_at("/api", ok(1_500), &cfg, NOW).await;
        cb.record_at("/api", ok(1_500), &cfg, NOW).await;
        assert_eq!(cb.check_at("/api", &cfg, NOW + 100).await, BreakerDecision::Reject);
    }

    #[tokio::test]
    async fn success_on_clean_state_writes_nothing() {
        let store = MemoryStore::new();
        let cb = CircuitBreaker::new(store.clone());
        cb.record_at("/api", ok(10), &config(), NOW).await;
        assert!(store.get("breaker:/api").await.unwrap().is_none());
    }
}
