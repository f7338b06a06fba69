//! Per-client rate limiting middleware.
//!
//! Sliding-window limits keyed by the peer IP address. The bearer token
//! is not used: it is unverified at this point in the stack.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// Extract a rate-limit key from the request.
///
/// Requests served without connection info (in-process callers) share
/// one bucket.
fn rate_key(req: &Request<axum::body::Body>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("peer:{}", addr.ip()))
        .unwrap_or_else(|| "peer:local".to_string())
}

/// Per-client rate limiting. Returns 429 if exceeded.
pub async fn limit(req: Request<axum::body::Body>, next: Next) -> Response {
    match limit_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_inner(
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let key = rate_key(&req);

    // MutexGuard is !Send, must drop before .await
    {
        let mut limiter = ctx
            .rate_limiter
            .lock()
            .map_err(|_| ApiError::Internal("rate limiter lock".into()))?;

        limiter.check(&key).map_err(|retry_after| {
            tracing::warn!(key = %key, retry_after, "Rate limit exceeded");
            ApiError::RateLimited { retry_after }
        })?;
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_from(peer: Option<&str>, token: Option<&str>) -> Request<axum::body::Body> {
        let mut builder = Request::builder().uri("/api/doctors");
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        let mut req = builder.body(axum::body::Body::empty()).unwrap();
        if let Some(p) = peer {
            let addr: SocketAddr = p.parse().unwrap();
            req.extensions_mut().insert(ConnectInfo(addr));
        }
        req
    }

    #[test]
    fn key_is_peer_ip_not_token() {
        let a = rate_key(&request_from(Some("203.0.113.7:50000"), Some("fake-1")));
        let b = rate_key(&request_from(Some("203.0.113.7:50001"), Some("fake-2")));
        assert_eq!(a, "peer:203.0.113.7");
        assert_eq!(a, b);
        assert_ne!(a, rate_key(&request_from(Some("198.51.100.2:50000"), None)));
    }

    #[test]
    fn missing_connect_info_falls_back() {
        assert_eq!(rate_key(&request_from(None, Some("abc"))), "peer:local");
    }
}
