//! API endpoints.

mod account;
mod admin;
mod bots;
mod coins;
mod features;
mod payments;
mod referrals;
mod reports;
mod unlocks;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/bots", bots::router())
        .nest("/coins", coins::router())
        .nest("/referrals", referrals::router())
        .nest("/unlocks", unlocks::router())
        .nest("/features", features::router())
        .nest("/payments", payments::router())
        .nest("/reports", reports::router())
        .nest("/account", account::router())
        .nest("/admin", admin::router())
}
