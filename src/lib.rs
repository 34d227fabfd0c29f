//! Outbound resilience gateway library.
//!
//! Sits between stateless compute invocations and a flaky third-party
//! HTTP API: admission control per mapping, circuit breaking per mapping,
//! byte-faithful forwarding with redirect-following. All coordination
//! state lives in an external store with conditional writes.

pub mod config;
pub mod error;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod store;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
