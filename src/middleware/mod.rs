//! Middleware for the journal backend

pub mod rate_limit;

pub use rate_limit::{auth_rate_limit_middleware, cleanup_task, AuthRateLimits, RateLimitConfig, RateLimiter};
