//! Per-identity rate limiting over a rolling window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::auth::RequestContext;
use crate::config::RateLimitConfig;
use crate::errors::AppError;
use crate::AppState;

/// Sliding-log limiter: each identity may make `requests` calls in any
/// `window`-long interval. State lives in memory only.
pub struct RateLimiter {
    requests: usize,
    window: Duration,
    hits: DashMap<String, VecDeque<Instant>>,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            requests: config.requests as usize,
            window: config.window,
            hits: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.requests > 0 && !self.window.is_zero()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request for `key`; false once its budget is spent.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        if !self.is_enabled() {
            return true;
        }
        self.sweep(now);

        let mut hits = self.hits.entry(key.to_string()).or_default();
        while let Some(&oldest) = hits.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                hits.pop_front();
            } else {
                break;
            }
        }

        if hits.len() >= self.requests {
            return false;
        }
        hits.push_back(now);
        true
    }

    /// Drop identities with no hit inside the window, at most once per window.
    fn sweep(&self, now: Instant) {
        {
            let mut last = self.last_sweep.lock();
            if now.saturating_duration_since(*last) < self.window {
                return;
            }
            *last = now;
        }

        let window = self.window;
        self.hits.retain(|_, hits| {
            hits.back()
                .is_some_and(|&latest| now.saturating_duration_since(latest) < window)
        });
    }
}

/// Rate limiting layer keyed by the authenticated user id.
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ctx) = request.extensions().get::<RequestContext>() else {
        return AppError::Internal("request context missing".to_string()).into_response();
    };

    if !state.limiter.check(&ctx.user_id) {
        tracing::warn!(user_id = %ctx.user_id, request_id = %ctx.request_id, "rate limit exceeded");
        let mut response = AppError::RateLimited.into_response();
        if let Ok(value) = HeaderValue::from_str(&state.limiter.window().as_secs().max(1).to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(requests: u32, window_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            requests,
            window: Duration::from_millis(window_ms),
        })
    }

    #[test]
    fn test_disabled_when_zero_requests() {
        let limiter = limiter(0, 1000);
        assert!(!limiter.is_enabled());
        assert!((0..100).all(|_| limiter.check("alice")));
    }

    #[test]
    fn test_budget_is_per_identity() {
        let limiter = limiter(2, 60_000);
        let now = Instant::now();

        assert!(limiter.check_at("alice", now));
        assert!(limiter.check_at("alice", now));
        assert!(!limiter.check_at("alice", now));
        assert!(limiter.check_at("bob", now));
    }

    #[test]
    fn test_window_rolls() {
        let limiter = limiter(2, 1000);
        let start = Instant::now();

        assert!(limiter.check_at("alice", start));
        assert!(limiter.check_at("alice", start + Duration::from_millis(500)));
        assert!(!limiter.check_at("alice", start + Duration::from_millis(900)));

        // The first hit has aged out, the second has not
        assert!(limiter.check_at("alice", start + Duration::from_millis(1000)));
        assert!(!limiter.check_at("alice", start + Duration::from_millis(1200)));
        assert!(limiter.check_at("alice", start + Duration::from_millis(1500)));
    }

    #[test]
    fn test_rejected_requests_do_not_consume_budget() {
        let limiter = limiter(1, 1000);
        let start = Instant::now();

        assert!(limiter.check_at("alice", start));
        for ms in [100, 200, 300] {
            assert!(!limiter.check_at("alice", start + Duration::from_millis(ms)));
        }
        assert!(limiter.check_at("alice", start + Duration::from_millis(1000)));
    }

    #[test]
    fn test_idle_identities_are_evicted() {
        let limiter = limiter(5, 1000);
        let start = Instant::now();

        for i in 0..10_000 {
            assert!(limiter.check_at(&format!("user-{}", i), start));
        }
        assert_eq!(limiter.hits.len(), 10_000);

        assert!(limiter.check_at("alice", start + Duration::from_secs(3600)));
        assert_eq!(limiter.hits.len(), 1);
        assert!(limiter.hits.contains_key("alice"));
    }

    #[test]
    fn test_sweep_keeps_identities_inside_the_window() {
        let limiter = limiter(2, 1000);
        let start = Instant::now();

        assert!(limiter.check_at("alice", start));
        assert!(limiter.check_at("bob", start + Duration::from_millis(600)));
        assert!(limiter.check_at("carol", start + Duration::from_millis(1200)));

        // alice aged out, bob still holds a live hit
        assert_eq!(limiter.hits.len(), 2);
        assert!(!limiter.hits.contains_key("alice"));
        assert!(limiter.check_at("bob", start + Duration::from_millis(1300)));
        assert!(!limiter.check_at("bob", start + Duration::from_millis(1400)));
    }
}
