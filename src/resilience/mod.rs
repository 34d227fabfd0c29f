//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request for a mapping:
//!     → breaker.rs  (fail fast if the upstream is known-unhealthy)
//!     → rate_limit.rs (admit or reject within the fixed window)
//!     → forward, then breaker.rs records the outcome
//! ```
//!
//! # Design Decisions
//! - Both components keep their state in the shared StateStore, never in
//!   process memory: invocations may not share a process
//! - All mutation is optimistic compare-and-swap with a small retry bound;
//!   a lost race never busy-loops
//! - A rate-limit rejection never touches breaker state, and vice versa

pub mod breaker;
pub mod rate_limit;

pub use breaker::{BreakerDecision, CircuitBreaker, Outcome};
pub use rate_limit::RateLimiter;

/// Bounded CAS retries shared by both components; on exhaustion the
/// limiter fails closed and the breaker drops the outcome.
pub(crate) const MAX_CAS_ATTEMPTS: u32 = 3;

/// Milliseconds since the Unix epoch.
pub(crate) fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
