//! Core business logic for amora.
//!
//! Bot engagement (settings resolution, cooldowns, the auto-like loop) and
//! the coin economy (ledger, spend confirmation, access unlocks, referrals,
//! payments) plus report-driven moderation.

pub mod services;

pub use services::*;
