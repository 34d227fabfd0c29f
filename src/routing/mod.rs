//! Mapping resolution.
//!
//! # Responsibilities
//! - Match an inbound request path against configured path prefixes
//! - Hand back the upstream base URL and resilience policy for that prefix
//!
//! # Design Decisions
//! - Path prefix matching only, case-sensitive; longest prefix wins
//! - Pure lookup over the current config snapshot; no side effects
//! - Unmatched paths are a client error (404), nothing is mutated

pub mod resolver;

pub use resolver::MappingResolver;
