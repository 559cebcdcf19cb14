//! Database entities.

#![allow(missing_docs)]

pub mod access_plan;
pub mod access_unlock;
pub mod app_setting;
pub mod audit_log;
pub mod bot_config;
pub mod bot_cooldown;
pub mod bot_global_settings;
pub mod bot_group;
pub mod coin_transaction;
pub mod moderation_settings;
pub mod notification;
pub mod payment;
pub mod profile_like;
pub mod report;
pub mod risk_score;
pub mod user;

pub use access_plan::Entity as AccessPlan;
pub use access_unlock::Entity as AccessUnlock;
pub use app_setting::Entity as AppSetting;
pub use audit_log::Entity as AuditLog;
pub use bot_config::Entity as BotConfig;
pub use bot_cooldown::Entity as BotCooldown;
pub use bot_global_settings::Entity as BotGlobalSettings;
pub use bot_group::Entity as BotGroup;
pub use coin_transaction::Entity as CoinTransaction;
pub use moderation_settings::Entity as ModerationSettings;
pub use notification::Entity as Notification;
pub use payment::Entity as Payment;
pub use profile_like::Entity as ProfileLike;
pub use report::Entity as Report;
pub use risk_score::Entity as RiskScore;
pub use user::Entity as User;
