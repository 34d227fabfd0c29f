//! The upstream HTTP call, redirects included.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use url::Url;

use crate::config::ForwardConfig;
use crate::forward::headers::{end_to_end_request_headers, sanitize_response_headers};

/// A forwarding failure. Every variant is an upstream failure from the
/// caller's point of view (HTTP 500) and a failure to the breaker.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("reading upstream body failed: {0}")]
    Body(#[from] hyper::Error),

    #[error("upstream call timed out")]
    Timeout,

    #[error("redirect limit of {0} exceeded")]
    TooManyRedirects(u32),

    #[error("invalid redirect target {0:?}")]
    InvalidRedirect(String),

    #[error("invalid upstream url {0:?}")]
    InvalidUrl(String),
}

/// The final upstream response, body fully buffered.
#[derive(Debug)]
pub struct ForwardedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Forwards a single request to an upstream, following redirects.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
    redirect_limit: u32,
}

impl HttpForwarder {
    pub fn new(config: &ForwardConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            timeout: Duration::from_secs(config.timeout_secs),
            redirect_limit: config.redirect_limit,
        }
    }

    /// Issue the request and follow redirects up to the configured bound.
    /// The timeout covers the whole chain.
    pub async fn forward(
        &self,
        method: Method,
        url: Url,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<ForwardedResponse, ForwardError> {
        tokio::time::timeout(self.timeout, self.follow(method, url, headers, body))
            .await
            .map_err(|_| ForwardError::Timeout)?
    }

    async fn follow(
        &self,
        mut method: Method,
        mut url: Url,
        headers: &HeaderMap,
        mut body: Bytes,
    ) -> Result<ForwardedResponse, ForwardError> {
        let headers = end_to_end_request_headers(headers);
        let mut hops = 0u32;

        loop {
            let uri: Uri = url
                .as_str()
                .parse()
                .map_err(|_| ForwardError::InvalidUrl(url.to_string()))?;

            let mut builder = Request::builder().method(method.clone()).uri(uri);
            if let Some(outbound) = builder.headers_mut() {
                for (name, value) in headers.iter() {
                    outbound.append(name.clone(), value.clone());
                }
            }
            let request = builder
                .body(Full::new(body.clone()))
                .map_err(|_| ForwardError::InvalidUrl(url.to_string()))?;

            let response = self.client.request(request).await?;
            let status = response.status();

            if status.is_redirection() {
                // 304 and friends carry no Location and are final responses.
                if let Some(location) = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                {
                    hops += 1;
                    if hops > self.redirect_limit {
                        return Err(ForwardError::TooManyRedirects(self.redirect_limit));
                    }

                    url = url
                        .join(location)
                        .map_err(|_| ForwardError::InvalidRedirect(location.to_string()))?;

                    // 303 demotes to GET without a body; 301/302/307/308
                    // re-issue with the original method and body.
                    if status == StatusCode::SEE_OTHER {
                        method = Method::GET;
                        body = Bytes::new();
                    }

                    tracing::debug!(status = %status, target = %url, hop = hops, "Following redirect");
                    continue;
                }
            }

            let (parts, incoming) = response.into_parts();
            let bytes = incoming.collect().await?.to_bytes();

            return Ok(ForwardedResponse {
                status,
                headers: sanitize_response_headers(parts.headers),
                body: bytes,
            });
        }
    }
}
