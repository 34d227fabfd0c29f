//! Upstream forwarding.
//!
//! # Responsibilities
//! - Perform the actual upstream HTTP call
//! - Follow redirects with the correct method-preservation rules
//! - Pass bodies through byte-identical and headers unmodified except for
//!   hop-by-hop ones
//! - Enforce a fixed per-call timeout independent of the caller
//!
//! # Design Decisions
//! - No internal retries; a failed call surfaces immediately and the
//!   breaker decides what happens to later traffic
//! - The timeout covers the whole redirect chain, so one forwarded request
//!   costs at most one timeout regardless of hops

pub mod forwarder;
pub mod headers;

pub use forwarder::{ForwardError, ForwardedResponse, HttpForwarder};
