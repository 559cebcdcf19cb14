//! Business logic services.

#![allow(missing_docs)]

pub mod access_unlock;
pub mod account;
pub mod audit;
pub mod auto_like;
pub mod bot_settings;
pub mod cooldown;
pub mod economy;
pub mod feature_flags;
pub mod moderation;
pub mod payment;
pub mod referral;
pub mod risk;
pub mod spend_confirm;

pub use access_unlock::AccessUnlockService;
pub use account::AccountService;
pub use audit::AuditService;
pub use auto_like::AutoLikeService;
pub use bot_settings::BotSettingsService;
pub use cooldown::CooldownService;
pub use economy::EconomyService;
pub use feature_flags::FeatureFlagService;
pub use moderation::ModerationService;
pub use payment::PaymentService;
pub use referral::ReferralService;
pub use risk::RiskService;
pub use spend_confirm::{ConfirmationGate, ConfirmationRegistry};
