//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the outbound gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Mapping definitions keying inbound path prefixes to upstreams.
    pub mappings: Vec<MappingConfig>,

    /// Forwarding behavior (timeout, redirect bound, body cap).
    pub forward: ForwardConfig,

    /// Coordination state store settings.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A proxy mapping: an inbound path prefix, the upstream it forwards to,
/// and the resilience policy protecting that upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingConfig {
    /// Inbound path prefix to match (longest prefix wins).
    pub match_key: String,

    /// Upstream base URL the matched path is appended to.
    pub upstream_base_url: String,

    /// Admitted requests per fixed 1-second window.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: u32,

    /// Circuit breaker thresholds for this upstream.
    #[serde(default)]
    pub breaker: BreakerConfig,
}

fn default_rate_limit() -> u32 {
    50
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub error_threshold: u32,

    /// Responses slower than this count as failures.
    pub latency_ms: u64,

    /// Minimum time the breaker stays open before a trial request.
    pub cooldown_seconds: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            error_threshold: 5,
            latency_ms: 2_000,
            cooldown_seconds: 30,
        }
    }
}

/// Forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Per-call upstream timeout in seconds (covers the redirect chain).
    pub timeout_secs: u64,

    /// Maximum redirect hops before the call fails.
    pub redirect_limit: u32,

    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            redirect_limit: 5,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// State store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendKind {
    /// In-process map; correct only for a single gateway instance.
    Memory,
    /// SQLite file shared by all instances.
    Sqlite,
}

/// What the rate limiter does when the store is unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutagePolicy {
    /// Admit traffic; a store outage must not take down all egress.
    FailOpen,
    /// Reject traffic until the store recovers.
    FailClosed,
}

/// Coordination state store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Which backend holds rate/breaker state.
    pub backend: StoreBackendKind,

    /// Database path when `backend = "sqlite"`.
    pub sqlite_path: String,

    /// Admission policy while the store is unreachable.
    pub on_outage: OutagePolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::Memory,
            sqlite_path: "gateway-state.db".to_string(),
            on_outage: OutagePolicy::FailOpen,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
