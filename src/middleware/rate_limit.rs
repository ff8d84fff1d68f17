//! Sliding-window rate limiting for the signup and login endpoints

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::AppError;

/// Requests allowed per window
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_duration: Duration,
}

/// Limits for the credential endpoints
pub struct AuthRateLimits;

impl AuthRateLimits {
    pub const LOGIN: RateLimitConfig = RateLimitConfig {
        requests_per_window: 5,
        window_duration: Duration::from_secs(900), // 15 minutes
    };

    pub const SIGNUP: RateLimitConfig = RateLimitConfig {
        requests_per_window: 3,
        window_duration: Duration::from_secs(3600), // 1 hour
    };

    /// Limit for a request path, if it is rate limited at all.
    pub fn for_path(path: &str) -> Option<RateLimitConfig> {
        match path.trim_end_matches('/') {
            "/api/login" => Some(Self::LOGIN),
            "/api/signup" => Some(Self::SIGNUP),
            _ => None,
        }
    }
}

/// Request timestamps per client key
#[derive(Debug, Default)]
pub struct RateLimiter {
    requests: RwLock<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request for `key` and report whether it fits in the window.
    pub async fn check(&self, key: &str, config: &RateLimitConfig) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        let history = requests.entry(key.to_string()).or_default();

        history.retain(|&t| now.duration_since(t) < config.window_duration);
        if history.len() < config.requests_per_window as usize {
            history.push(now);
            true
        } else {
            false
        }
    }

    /// Drop histories older than the longest window.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let horizon = AuthRateLimits::SIGNUP
            .window_duration
            .max(AuthRateLimits::LOGIN.window_duration);

        let mut requests = self.requests.write().await;
        requests.retain(|_, history| {
            history.retain(|&t| now.duration_since(t) < horizon);
            !history.is_empty()
        });
    }

    fn client_ip(req: &Request) -> String {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(',').next().unwrap_or_default().trim().to_string())
                .filter(|v| !v.is_empty())
        };

        header("x-forwarded-for")
            .or_else(|| header("x-real-ip"))
            .or_else(|| {
                req.extensions()
                    .get::<axum::extract::ConnectInfo<SocketAddr>>()
                    .map(|info| info.0.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Rejects signup/login bursts from one client with 429.
pub async fn auth_rate_limit_middleware(
    State(rate_limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let Some(config) = AuthRateLimits::for_path(&path) else {
        return next.run(request).await;
    };

    let client_ip = RateLimiter::client_ip(&request);
    let key = format!("auth:{}:{}", client_ip, path.trim_end_matches('/'));

    if !rate_limiter.check(&key, &config).await {
        warn!(client_ip = %client_ip, path = %path, "Auth rate limit exceeded");
        return AppError::RateLimit.into_response();
    }

    next.run(request).await
}

/// Periodically prune stale entries.
pub async fn cleanup_task(rate_limiter: Arc<RateLimiter>) {
    let mut interval = tokio::time::interval(Duration::from_secs(300)); // Every 5 minutes

    loop {
        interval.tick().await;
        rate_limiter.cleanup().await;
        debug!("Cleaned up expired rate limit entries");
    }
}
