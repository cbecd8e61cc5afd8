//! Per-client rate limiting middleware
//!
//! Admits or refuses each request against the shared [`RateLimiter`]. Clients
//! are keyed by peer IP address, or by the first `X-Forwarded-For` entry when
//! the service runs behind a trusted proxy.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header::HeaderValue, HeaderName},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{
    config::RateLimitConfig,
    error::Error,
    rate_limit::{Decision, RateLimiter},
};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Key used when neither a peer address nor a forwarded address is known
const UNKNOWN_CLIENT: &str = "unknown";

/// Rate limiting middleware state
#[derive(Clone)]
pub struct RateLimit {
    limiter: RateLimiter,
    trust_forwarded_for: bool,
}

impl RateLimit {
    pub fn new(limiter: RateLimiter, config: &RateLimitConfig) -> Self {
        Self {
            limiter,
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }

    /// Middleware function to enforce rate limits
    ///
    /// Refused requests never reach the handler and get a 429 with
    /// `Retry-After`. Admitted responses carry `x-ratelimit-limit` and
    /// `x-ratelimit-remaining`.
    pub async fn middleware(
        State(rate_limit): State<Self>,
        request: Request<Body>,
        next: Next,
    ) -> Result<Response, Error> {
        let client = rate_limit.client_key(&request);

        match rate_limit.limiter.check(&client) {
            Decision::Allowed { remaining } => {
                let mut response = next.run(request).await;
                Self::add_rate_limit_headers(&mut response, rate_limit.limiter.burst(), remaining);
                Ok(response)
            }
            Decision::Denied { retry_after } => {
                warn!(
                    client = %client,
                    path = %request.uri().path(),
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Rate limit exceeded"
                );
                Err(Error::RateLimitExceeded {
                    retry_after_secs: whole_seconds(retry_after),
                })
            }
        }
    }

    fn client_key(&self, request: &Request<Body>) -> String {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get(FORWARDED_FOR)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty());

            if let Some(addr) = forwarded {
                return addr.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }

    /// Add rate limit headers to response
    fn add_rate_limit_headers(response: &mut Response, limit: u32, remaining: u32) {
        let headers = response.headers_mut();
        headers.insert(
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderValue::from(limit),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderValue::from(remaining),
        );
    }
}

/// Round up to whole seconds, never below one
fn whole_seconds(wait: Duration) -> u64 {
    (wait.as_secs_f64().ceil() as u64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn app(burst: u32, trust_forwarded_for: bool) -> Router {
        let config = RateLimitConfig {
            requests_per_second: 0.5,
            burst,
            trust_forwarded_for,
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::new(&config).unwrap();
        let rate_limit = RateLimit::new(limiter, &config);

        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                rate_limit,
                RateLimit::middleware,
            ))
    }

    fn request_from(peer: &str, forwarded: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/");
        if let Some(forwarded) = forwarded {
            builder = builder.header(FORWARDED_FOR, forwarded);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    #[tokio::test(start_paused = true)]
    async fn test_admits_burst_then_refuses() {
        let app = app(2, false);

        for expected_remaining in ["1", "0"] {
            let response = app
                .clone()
                .oneshot(request_from("192.0.2.1:4000", None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["x-ratelimit-limit"], "2");
            assert_eq!(response.headers()["x-ratelimit-remaining"], expected_remaining);
        }

        let refused = app
            .clone()
            .oneshot(request_from("192.0.2.1:4001", None))
            .await
            .unwrap();
        assert_eq!(refused.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(refused.headers()[header::RETRY_AFTER], "2");

        let other_client = app
            .oneshot(request_from("192.0.2.2:4000", None))
            .await
            .unwrap();
        assert_eq!(other_client.status(), StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwarded_for_ignored_unless_trusted() {
        let app = app(1, false);

        let first = app
            .clone()
            .oneshot(request_from("192.0.2.1:4000", Some("203.0.113.7")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let spoofed = app
            .oneshot(request_from("192.0.2.1:4000", Some("203.0.113.8")))
            .await
            .unwrap();
        assert_eq!(spoofed.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwarded_for_keys_clients_when_trusted() {
        let app = app(1, true);

        for forwarded in ["203.0.113.7, 10.0.0.1", "203.0.113.8"] {
            let response = app
                .clone()
                .oneshot(request_from("192.0.2.1:4000", Some(forwarded)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let repeat = app
            .oneshot(request_from("192.0.2.1:4000", Some("203.0.113.7")))
            .await
            .unwrap();
        assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_whole_seconds_rounds_up() {
        assert_eq!(whole_seconds(Duration::ZERO), 1);
        assert_eq!(whole_seconds(Duration::from_millis(200)), 1);
        assert_eq!(whole_seconds(Duration::from_millis(2000)), 2);
        assert_eq!(whole_seconds(Duration::from_millis(2001)), 3);
    }
}
