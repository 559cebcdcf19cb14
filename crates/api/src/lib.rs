//! HTTP API layer for amora.
//!
//! - **Endpoints**: bot engagement, coins, unlocks, referrals, payments,
//!   reports and the admin surface
//! - **Extractors**: authenticated and staff users
//! - **Middleware**: bearer-token auth, rate limiting
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod rate_limit;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
pub use rate_limit::{ApiRateLimiter, RateLimitConfig, RateLimiterState};
