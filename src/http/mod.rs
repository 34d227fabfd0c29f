//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all route)
//!     → request.rs (stamp request ID)
//!     → proxy_handler (resolve → breaker → limiter → forward → record)
//!     → Send response to caller
//! ```

pub mod request;
pub mod server;

pub use request::{RequestIdLayer, X_REQUEST_ID};
pub use server::GatewayServer;
