//! Rate limiting service.

mod limiter;

pub use limiter::RateLimiter;
