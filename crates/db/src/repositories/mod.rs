//! Database repositories.

pub mod access;
pub mod app_setting;
pub mod audit_log;
pub mod bot;
pub mod cooldown;
pub mod ledger;
pub mod like;
pub mod moderation;
pub mod notification;
pub mod payment;
pub mod risk_score;
pub mod user;

pub use access::AccessRepository;
pub use app_setting::AppSettingRepository;
pub use audit_log::AuditLogRepository;
pub use bot::BotRepository;
pub use cooldown::CooldownRepository;
pub use ledger::LedgerRepository;
pub use like::LikeRepository;
pub use moderation::ModerationRepository;
pub use notification::NotificationRepository;
pub use payment::PaymentRepository;
pub use risk_score::RiskScoreRepository;
pub use user::UserRepository;
