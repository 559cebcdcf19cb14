//! API middleware.

#![allow(missing_docs)]

use std::{sync::Arc, time::Duration};

use amora_common::Config;
use amora_core::{
    AccessUnlockService, AccountService, AuditService, AutoLikeService, BotSettingsService,
    ConfirmationRegistry, CooldownService, EconomyService, FeatureFlagService, ModerationService,
    PaymentService, ReferralService, RiskService,
};
use amora_db::repositories::{
    AccessRepository, AppSettingRepository, AuditLogRepository, BotRepository, CooldownRepository,
    LedgerRepository, LikeRepository, ModerationRepository, NotificationRepository,
    PaymentRepository, RiskScoreRepository, UserRepository,
};
use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use sea_orm::DatabaseConnection;

use crate::rate_limit::{ApiRateLimiter, RateLimitConfig};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_repo: UserRepository,
    pub bot_settings_service: BotSettingsService,
    pub auto_like_service: AutoLikeService,
    pub economy_service: EconomyService,
    pub access_unlock_service: AccessUnlockService,
    pub feature_flag_service: FeatureFlagService,
    pub moderation_service: ModerationService,
    pub referral_service: ReferralService,
    pub payment_service: PaymentService,
    pub risk_service: RiskService,
    pub account_service: AccountService,
    pub confirmations: ConfirmationRegistry,
    pub confirm_timeout: Duration,
    pub auto_like_limiter: ApiRateLimiter,
    pub auto_like_limit: RateLimitConfig,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, config: &Config) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let bot_repo = BotRepository::new(Arc::clone(&db));
        let cooldown_repo = CooldownRepository::new(Arc::clone(&db));
        let like_repo = LikeRepository::new(Arc::clone(&db));
        let ledger_repo = LedgerRepository::new(Arc::clone(&db));
        let access_repo = AccessRepository::new(Arc::clone(&db));
        let setting_repo = AppSettingRepository::new(Arc::clone(&db));
        let moderation_repo = ModerationRepository::new(Arc::clone(&db));
        let payment_repo = PaymentRepository::new(Arc::clone(&db));
        let risk_repo = RiskScoreRepository::new(Arc::clone(&db));
        let audit_repo = AuditLogRepository::new(Arc::clone(&db));
        let notification_repo = NotificationRepository::new(Arc::clone(&db));

        let audit = AuditService::new(audit_repo, notification_repo);
        let bot_settings_service = BotSettingsService::new(bot_repo.clone(), user_repo.clone());
        let auto_like_service = AutoLikeService::new(
            user_repo.clone(),
            bot_repo,
            like_repo,
            bot_settings_service.clone(),
            CooldownService::new(cooldown_repo),
            audit.clone(),
            config.bots.clone(),
        );
        let feature_flag_service = FeatureFlagService::new(setting_repo);
        let economy_service = EconomyService::new(
            user_repo.clone(),
            ledger_repo,
            feature_flag_service.clone(),
            &config.economy,
        );
        let access_unlock_service =
            AccessUnlockService::new(Arc::clone(&db), access_repo, user_repo.clone());
        let moderation_service =
            ModerationService::new(moderation_repo.clone(), user_repo.clone(), audit.clone());
        let referral_service = ReferralService::new(
            Arc::clone(&db),
            user_repo.clone(),
            economy_service.clone(),
            audit.clone(),
            &config.economy,
        );
        let payment_service =
            PaymentService::new(payment_repo.clone(), audit.clone(), config.payments.clone());
        let risk_service = RiskService::new(
            risk_repo,
            user_repo.clone(),
            moderation_repo,
            payment_repo,
        );
        let account_service = AccountService::new(user_repo.clone(), audit);

        Self {
            user_repo,
            bot_settings_service,
            auto_like_service,
            economy_service,
            access_unlock_service,
            feature_flag_service,
            moderation_service,
            referral_service,
            payment_service,
            risk_service,
            account_service,
            confirmations: ConfirmationRegistry::new(),
            confirm_timeout: Duration::from_secs(config.economy.confirm_timeout_secs),
            auto_like_limiter: ApiRateLimiter::new(),
            auto_like_limit: RateLimitConfig::new(
                config.bots.auto_like_max_calls,
                config.bots.auto_like_window_secs,
            ),
        }
    }
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` to a user and stores it in the
/// request extensions. Banned users are treated as anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string);

    if let Some(token) = token {
        match state.user_repo.find_by_token(&token).await {
            Ok(Some(user)) if !user.is_banned => {
                req.extensions_mut().insert(user);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Token lookup failed"),
        }
    }

    next.run(req).await
}
