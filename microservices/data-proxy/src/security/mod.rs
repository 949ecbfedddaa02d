//! Security Module

mod client_ip;
mod cors;
mod rate_limiter;

pub use client_ip::client_ip;
pub use cors::CorsPolicy;
pub use rate_limiter::{RateLimitConfig, RateLimitResult, RateLimiter};
