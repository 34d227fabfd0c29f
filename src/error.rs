//! Request-level error taxonomy.
//!
//! No class crosses into another: a rate-limit rejection never touches
//! breaker state, an open breaker never consumes rate budget, and only
//! upstream failures are ever recorded against the breaker.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::forward::ForwardError;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// No mapping for the inbound path. Fatal to the request, nothing mutated.
    #[error("no mapping matches path {0:?}")]
    MappingNotFound(String),

    /// Window full. Caller's responsibility to retry later.
    #[error("rate limit exceeded for {0:?}")]
    RateLimitExceeded(String),

    /// Breaker open; upstream was not contacted.
    #[error("circuit open for {0:?}, upstream not contacted")]
    BreakerOpen(String),

    /// Inbound body exceeded the configured cap.
    #[error("request body exceeds the configured size limit")]
    BodyTooLarge,

    /// Upstream failure (transport, timeout, non-redirect handling,
    /// redirect bound). Recorded against the breaker, never retried.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] ForwardError),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MappingNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::BreakerOpen(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            GatewayError::MappingNotFound("/x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::RateLimitExceeded("/x".into()).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            GatewayError::BreakerOpen("/x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            GatewayError::Upstream(ForwardError::Timeout).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::Upstream(ForwardError::TooManyRedirects(5)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
