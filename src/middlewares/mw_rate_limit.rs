use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use moka::future::Cache;

use crate::{error::Error, middlewares::mw_auth::Ctx, AppState};

const MAX_REQUESTS_PER_MINUTE: usize = 150;
const MAX_REQUESTS_PER_10SEC: usize = 10;

/// Fixed-window request counters per user/IP.
///
/// Each window is a moka entry whose time-to-live is the window length, so a
/// counter disappears (and the window restarts) once it has lived that long.
#[derive(Clone)]
pub struct RateLimiter {
    minute: Cache<String, Arc<AtomicUsize>>,
    burst: Cache<String, Arc<AtomicUsize>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            minute: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(Duration::from_secs(60))
                .build(),
            burst: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(Duration::from_secs(10))
                .build(),
        }
    }

    async fn hit(cache: &Cache<String, Arc<AtomicUsize>>, identifier: &str) -> usize {
        let counter = cache
            .get_with(identifier.to_string(), async { Arc::new(AtomicUsize::new(0)) })
            .await;
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Counts one request; `false` once either window is exhausted.
    pub async fn check(&self, identifier: &str) -> bool {
        if Self::hit(&self.minute, identifier).await > MAX_REQUESTS_PER_MINUTE {
            return false;
        }

        // Only check burst if we're under minute limit
        Self::hit(&self.burst, identifier).await <= MAX_REQUESTS_PER_10SEC
    }
}

/// Global rate limiting middleware that only blocks heavy spammers
///
/// Limits:
/// - 150 requests per minute per user/IP
/// - 10 requests per 10 seconds (prevents rapid bursts)
///
/// Static assets are not counted.
pub async fn rate_limit_middleware(
    State(app_state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, Error> {
    if req.uri().path().starts_with("/static/") {
        return Ok(next.run(req).await);
    }

    // Identify the requester (user or IP)
    let identifier = req
        .extensions()
        .get::<Ctx>()
        .map(|ctx| format!("user:{}", ctx.user_id))
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        })
        .unwrap_or_else(|| "ip:unknown".to_string());

    if !app_state.rate_limiter.check(&identifier).await {
        tracing::warn!("rate limit exceeded for {}", identifier);
        return Err(Error::RateLimited);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_limit() {
        let limiter = RateLimiter::new();

        for _ in 0..MAX_REQUESTS_PER_10SEC {
            assert!(limiter.check("ip:127.0.0.1").await);
        }
        assert!(!limiter.check("ip:127.0.0.1").await);

        // Other callers have their own windows.
        assert!(limiter.check("user:someone-else").await);
    }
}
