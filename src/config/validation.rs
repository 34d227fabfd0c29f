//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parseable)
//! - Detect duplicate mappings
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before a config is accepted into the system (initial load and reload)

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("listener bind_address {0:?} is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("mapping {index}: match_key must be a non-empty path prefix starting with '/'")]
    InvalidMatchKey { index: usize },

    #[error("mapping {match_key:?}: duplicate match_key")]
    DuplicateMatchKey { match_key: String },

    #[error("mapping {match_key:?}: upstream_base_url {url:?} is not a valid http URL")]
    InvalidUpstreamUrl { match_key: String, url: String },

    #[error("mapping {match_key:?}: upstream_base_url {url:?} uses scheme {scheme:?}; the forwarder speaks plain http only")]
    UnsupportedUpstreamScheme {
        match_key: String,
        url: String,
        scheme: String,
    },

    #[error("mapping {match_key:?}: rate_limit_per_second must be at least 1")]
    ZeroRateLimit { match_key: String },

    #[error("mapping {match_key:?}: breaker error_threshold must be at least 1")]
    ZeroErrorThreshold { match_key: String },

    #[error("forward.redirect_limit of 0 would reject every redirect; use at least 1")]
    ZeroRedirectLimit,

    #[error("forward.timeout_secs must be at least 1")]
    ZeroTimeout,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.forward.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.forward.redirect_limit == 0 {
        errors.push(ValidationError::ZeroRedirectLimit);
    }

    let mut seen = HashSet::new();
    for (index, mapping) in config.mappings.iter().enumerate() {
        if mapping.match_key.is_empty() || !mapping.match_key.starts_with('/') {
            errors.push(ValidationError::InvalidMatchKey { index });
            continue;
        }
        if !seen.insert(mapping.match_key.clone()) {
            errors.push(ValidationError::DuplicateMatchKey {
                match_key: mapping.match_key.clone(),
            });
        }

        match Url::parse(&mapping.upstream_base_url) {
            Ok(url) if url.scheme() == "http" => {}
            // The client is built on a plain HttpConnector; an https mapping
            // would pass here only to fail on every forward.
            Ok(url) => errors.push(ValidationError::UnsupportedUpstreamScheme {
                match_key: mapping.match_key.clone(),
                url: mapping.upstream_base_url.clone(),
                scheme: url.scheme().to_string(),
            }),
            Err(_) => errors.push(ValidationError::InvalidUpstreamUrl {
                match_key: mapping.match_key.clone(),
                url: mapping.upstream_base_url.clone(),
            }),
        }

        if mapping.rate_limit_per_second == 0 {
            errors.push(ValidationError::ZeroRateLimit {
                match_key: mapping.match_key.clone(),
            });
        }
        if mapping.breaker.error_threshold == 0 {
            errors.push(ValidationError::ZeroErrorThreshold {
                match_key: mapping.match_key.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
