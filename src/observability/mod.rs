//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via `tracing`; the request ID flows through every
//!   subsystem as a span/event field
//! - Metrics are cheap atomic increments, exposed for Prometheus scrape
//! - Degraded operation (state store unreachable) is always visible

pub mod metrics;
