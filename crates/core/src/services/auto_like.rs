//! Auto-like loop: lets bot profiles like a real user's profile.
//!
//! Runs inline in the request that triggers it. Each call examines a bounded
//! number of bots and sends a bounded number of likes.

use std::collections::{HashMap, HashSet};

use amora_common::{AppResult, IdGenerator, config::BotsConfig};
use amora_db::{
    entities::{notification::NotificationKind, profile_like},
    repositories::{BotRepository, LikeRepository, UserRepository},
};
use chrono::{DateTime, Timelike, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use sea_orm::Set;
use serde::Serialize;

use super::{
    audit::AuditService,
    bot_settings::{
        BotOverrides, BotSettingsService, EffectiveBotSettings, SettingsLayer, resolve_effective,
    },
    cooldown::{CooldownService, cooldown_active},
};

/// Outcome of evaluating one bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LikeDecision {
    /// Send the like.
    Like,
    /// The bot's automation is switched off.
    Inactive,
    /// The current UTC hour is not one of the bot's active hours.
    OutsideActiveHours,
    /// The bot interacted with the user too recently.
    OnCooldown,
    /// The bot has liked the user before.
    AlreadyLiked,
    /// The random draw did not clear the like rate.
    RollFailed,
}

/// Everything known about one bot when deciding.
#[derive(Debug, Clone)]
pub struct BotCandidate<'a> {
    pub is_active: bool,
    pub settings: &'a EffectiveBotSettings,
    pub last_interaction: Option<DateTime<Utc>>,
    pub already_liked: bool,
}

/// Decide whether one bot likes the user.
///
/// Checks run in order: active, already liked, active hours, cooldown, then
/// the roll. `roll` is only called once every other check has passed and
/// yields a uniform draw from `[0, 100)`; the bot passes iff it is below the
/// like rate.
#[must_use]
pub fn evaluate(
    candidate: &BotCandidate<'_>,
    now: DateTime<Utc>,
    roll: impl FnOnce() -> f64,
) -> LikeDecision {
    if !candidate.is_active {
        return LikeDecision::Inactive;
    }
    if candidate.already_liked {
        return LikeDecision::AlreadyLiked;
    }
    if !candidate.settings.active_hours.allows(now.hour()) {
        return LikeDecision::OutsideActiveHours;
    }
    if candidate
        .last_interaction
        .is_some_and(|last| cooldown_active(last, candidate.settings.cooldown_hours, now))
    {
        return LikeDecision::OnCooldown;
    }
    if roll() >= f64::from(candidate.settings.auto_like_rate) {
        return LikeDecision::RollFailed;
    }
    LikeDecision::Like
}

/// What one invocation did.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoLikeReport {
    /// Bots examined.
    pub scanned: usize,
    /// Bots that liked the user, in scan order.
    pub liked_by: Vec<String>,
}

/// Auto-like service.
#[derive(Clone)]
pub struct AutoLikeService {
    user_repo: UserRepository,
    bot_repo: BotRepository,
    like_repo: LikeRepository,
    settings: BotSettingsService,
    cooldowns: CooldownService,
    audit: AuditService,
    limits: BotsConfig,
    id_gen: IdGenerator,
}

impl AutoLikeService {
    /// Create a new auto-like service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        bot_repo: BotRepository,
        like_repo: LikeRepository,
        settings: BotSettingsService,
        cooldowns: CooldownService,
        audit: AuditService,
        limits: BotsConfig,
    ) -> Self {
        Self {
            user_repo,
            bot_repo,
            like_repo,
            settings,
            cooldowns,
            audit,
            limits,
            id_gen: IdGenerator::new(),
        }
    }

    /// Run the loop for `user_id` with an entropy-seeded RNG.
    pub async fn run(&self, user_id: &str, now: DateTime<Utc>) -> AppResult<AutoLikeReport> {
        let mut rng = StdRng::from_entropy();
        self.run_with_rng(user_id, now, &mut rng).await
    }

    /// Run the loop for `user_id` drawing from `rng`.
    pub async fn run_with_rng<R: Rng + Send>(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> AppResult<AutoLikeReport> {
        let Some(global) = self.settings.global().await? else {
            tracing::debug!("No global bot settings, auto-like disabled");
            return Ok(AutoLikeReport::default());
        };
        if !global.auto_like_enabled {
            return Ok(AutoLikeReport::default());
        }

        let bots = self
            .user_repo
            .find_active_bots(user_id, self.limits.scan_limit)
            .await?;
        if bots.is_empty() {
            return Ok(AutoLikeReport::default());
        }
        let bot_ids: Vec<String> = bots.iter().map(|b| b.id.clone()).collect();

        let configs: HashMap<String, BotOverrides> = self
            .bot_repo
            .find_configs_by_user_ids(&bot_ids)
            .await?
            .iter()
            .map(|c| (c.user_id.clone(), BotOverrides::from(c)))
            .collect();

        let mut group_ids: Vec<String> = configs
            .values()
            .filter_map(|c| c.group_id.clone())
            .collect();
        group_ids.sort_unstable();
        group_ids.dedup();
        let groups: HashMap<String, SettingsLayer> = self
            .bot_repo
            .find_groups_by_ids(&group_ids)
            .await?
            .iter()
            .map(|g| (g.id.clone(), SettingsLayer::from(g)))
            .collect();

        let last_interactions: HashMap<String, DateTime<Utc>> = self
            .cooldowns
            .last_interactions(&bot_ids, user_id)
            .await?
            .into_iter()
            .collect();
        let already_liked: HashSet<String> = self
            .like_repo
            .find_likers_of(&bot_ids, user_id)
            .await?
            .into_iter()
            .collect();

        let mut report = AutoLikeReport {
            scanned: bots.len(),
            liked_by: Vec::new(),
        };

        for bot in &bots {
            if report.liked_by.len() >= self.limits.max_likes_per_run {
                break;
            }

            let config = configs.get(&bot.id);
            let group = config
                .and_then(|c| c.group_id.as_ref())
                .and_then(|id| groups.get(id));
            let settings = resolve_effective(Some(&global), group, config);

            let candidate = BotCandidate {
                is_active: config.is_none_or(|c| c.is_active),
                settings: &settings,
                last_interaction: last_interactions.get(&bot.id).copied(),
                already_liked: already_liked.contains(&bot.id),
            };
            let decision = evaluate(&candidate, now, || rng.gen_range(0.0..100.0));

            if decision != LikeDecision::Like {
                tracing::trace!(bot_id = %bot.id, ?decision, "Bot skipped");
                continue;
            }

            let like = profile_like::ActiveModel {
                id: Set(self.id_gen.generate()),
                liker_id: Set(bot.id.clone()),
                liked_id: Set(user_id.to_string()),
                is_automated: Set(true),
                created_at: Set(now.into()),
            };
            // A concurrent run got there first
            if !self.like_repo.create_if_absent(like).await? {
                tracing::trace!(bot_id = %bot.id, decision = ?LikeDecision::AlreadyLiked, "Bot skipped");
                continue;
            }
            self.cooldowns
                .record_interaction(&bot.id, user_id, now)
                .await?;

            let body = format!(
                "{} liked your profile",
                bot.display_name.as_deref().unwrap_or(&bot.username)
            );
            self.audit.notify(user_id, NotificationKind::Like, &body).await;

            report.liked_by.push(bot.id.clone());
        }

        tracing::info!(
            user_id = %user_id,
            scanned = report.scanned,
            liked = report.liked_by.len(),
            "Auto-like run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::bot_settings::ActiveHours;
    use amora_db::{
        entities::{bot_config, bot_cooldown, bot_global_settings, user},
        repositories::{
            AuditLogRepository, CooldownRepository, NotificationRepository, user::fixtures,
        },
    };
    use chrono::{Duration, TimeZone};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use serde_json::json;
    use std::sync::Arc;

    fn settings(rate: i32, cooldown: i32, hours: &[u8]) -> EffectiveBotSettings {
        EffectiveBotSettings {
            auto_like_rate: rate,
            cooldown_hours: cooldown,
            active_hours: ActiveHours::from_hours(hours).unwrap(),
        }
    }

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, hour, 30, 0).unwrap()
    }

    fn candidate(settings: &EffectiveBotSettings) -> BotCandidate<'_> {
        BotCandidate {
            is_active: true,
            settings,
            last_interaction: None,
            already_liked: false,
        }
    }

    #[test]
    fn test_empty_active_hours_allow_every_hour() {
        let s = settings(100, 0, &[]);
        for hour in 0..24 {
            assert_eq!(evaluate(&candidate(&s), at_hour(hour), || 0.0), LikeDecision::Like);
        }
    }

    #[test]
    fn test_outside_active_hours() {
        let s = settings(100, 0, &[20, 21]);
        assert_eq!(
            evaluate(&candidate(&s), at_hour(9), || 0.0),
            LikeDecision::OutsideActiveHours
        );
        assert_eq!(evaluate(&candidate(&s), at_hour(21), || 0.0), LikeDecision::Like);
    }

    #[test]
    fn test_roll_boundaries() {
        let always = settings(100, 0, &[]);
        assert_eq!(evaluate(&candidate(&always), at_hour(12), || 99.999), LikeDecision::Like);

        let never = settings(0, 0, &[]);
        assert_eq!(
            evaluate(&candidate(&never), at_hour(12), || 0.0),
            LikeDecision::RollFailed
        );

        let half = settings(50, 0, &[]);
        assert_eq!(evaluate(&candidate(&half), at_hour(12), || 49.9), LikeDecision::Like);
        assert_eq!(
            evaluate(&candidate(&half), at_hour(12), || 50.0),
            LikeDecision::RollFailed
        );
    }

    #[test]
    fn test_inactive_and_cooldown_and_already_liked() {
        let s = settings(100, 72, &[]);
        let now = at_hour(12);

        let mut c = candidate(&s);
        c.is_active = false;
        assert_eq!(evaluate(&c, now, || 0.0), LikeDecision::Inactive);

        let mut c = candidate(&s);
        c.last_interaction = Some(now - Duration::hours(10));
        assert_eq!(evaluate(&c, now, || 0.0), LikeDecision::OnCooldown);

        c.last_interaction = Some(now - Duration::hours(72));
        assert_eq!(evaluate(&c, now, || 0.0), LikeDecision::Like);

        let mut c = candidate(&s);
        c.already_liked = true;
        assert_eq!(evaluate(&c, now, || 0.0), LikeDecision::AlreadyLiked);
    }

    #[test]
    fn test_roll_drawn_only_when_bot_can_act() {
        let s = settings(100, 72, &[20]);
        let now = at_hour(12);
        let mut draws = 0;

        let mut c = candidate(&s);
        c.is_active = false;
        let _ = evaluate(&c, now, || {
            draws += 1;
            0.0
        });
        let mut c = candidate(&s);
        c.already_liked = true;
        let _ = evaluate(&c, now, || {
            draws += 1;
            0.0
        });
        let _ = evaluate(&candidate(&s), now, || {
            draws += 1;
            0.0
        });
        assert_eq!(draws, 0);

        let open = settings(100, 0, &[]);
        assert_eq!(
            evaluate(&candidate(&open), now, || {
                draws += 1;
                0.0
            }),
            LikeDecision::Like
        );
        assert_eq!(draws, 1);
    }

    fn global_row(rate: i32, cooldown: i32, enabled: bool) -> bot_global_settings::Model {
        bot_global_settings::Model {
            id: bot_global_settings::BOT_GLOBAL_SETTINGS_ID.to_string(),
            auto_like_enabled: enabled,
            auto_like_rate: rate,
            cooldown_hours: cooldown,
            active_hours: json!([]),
            auto_story: false,
            profile_rotation_minutes: 0,
            updated_at: None,
        }
    }

    fn affected(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    fn service(db: &Arc<DatabaseConnection>, limits: BotsConfig) -> AutoLikeService {
        let user_repo = UserRepository::new(db.clone());
        let bot_repo = BotRepository::new(db.clone());
        AutoLikeService::new(
            user_repo.clone(),
            bot_repo.clone(),
            LikeRepository::new(db.clone()),
            BotSettingsService::new(bot_repo, user_repo),
            CooldownService::new(CooldownRepository::new(db.clone())),
            AuditService::new(
                AuditLogRepository::new(db.clone()),
                NotificationRepository::new(db.clone()),
            ),
            limits,
        )
    }

    fn statements(db: Arc<DatabaseConnection>) -> Vec<String> {
        Arc::try_unwrap(db)
            .unwrap()
            .into_transaction_log()
            .iter()
            .map(|t| format!("{t:?}"))
            .collect()
    }

    #[tokio::test]
    async fn test_single_bot_global_defaults_likes_once() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[global_row(100, 0, true)]])
                .append_query_results([[fixtures::bot("bot1")]])
                .append_query_results([Vec::<bot_config::Model>::new()])
                .append_query_results([Vec::<bot_cooldown::Model>::new()])
                .append_query_results([Vec::<std::collections::BTreeMap<&str, sea_orm::Value>>::new()])
                .append_exec_results([affected(1), affected(1)])
                .into_connection(),
        );

        let report = service(&db, BotsConfig::default())
            .run_with_rng("user1", at_hour(3), &mut StdRng::seed_from_u64(7))
            .await
            .unwrap();

        assert_eq!(report.scanned, 1);
        assert_eq!(report.liked_by, vec!["bot1".to_string()]);

        let log = statements(db);
        let inserts_into = |table: &str| {
            log.iter()
                .filter(|s| s.contains("INSERT INTO") && s.contains(table))
                .count()
        };
        let likes = inserts_into("profile_like");
        let upserts = inserts_into("bot_cooldown");
        assert_eq!(likes, 1);
        assert_eq!(upserts, 1);
    }

    #[tokio::test]
    async fn test_stops_at_like_cap() {
        let bots: Vec<user::Model> = (1..=4).map(|i| fixtures::bot(&format!("bot{i}"))).collect();
        let limits = BotsConfig {
            max_likes_per_run: 2,
            ..BotsConfig::default()
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[global_row(100, 0, true)]])
                .append_query_results([bots])
                .append_query_results([Vec::<bot_config::Model>::new()])
                .append_query_results([Vec::<bot_cooldown::Model>::new()])
                .append_query_results([Vec::<std::collections::BTreeMap<&str, sea_orm::Value>>::new()])
                .append_exec_results([affected(1), affected(1), affected(1), affected(1)])
                .into_connection(),
        );

        let report = service(&db, limits)
            .run_with_rng("user1", at_hour(3), &mut StdRng::seed_from_u64(7))
            .await
            .unwrap();

        assert_eq!(report.scanned, 4);
        assert_eq!(report.liked_by, vec!["bot1".to_string(), "bot2".to_string()]);
    }

    #[tokio::test]
    async fn test_like_lost_to_concurrent_run_is_skipped() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[global_row(100, 0, true)]])
                .append_query_results([[fixtures::bot("bot1")]])
                .append_query_results([Vec::<bot_config::Model>::new()])
                .append_query_results([Vec::<bot_cooldown::Model>::new()])
                .append_query_results([Vec::<std::collections::BTreeMap<&str, sea_orm::Value>>::new()])
                .append_exec_results([affected(0)])
                .into_connection(),
        );

        let report = service(&db, BotsConfig::default())
            .run_with_rng("user1", at_hour(3), &mut StdRng::seed_from_u64(7))
            .await
            .unwrap();

        assert_eq!(report.scanned, 1);
        assert!(report.liked_by.is_empty());

        let log = statements(db);
        assert!(log.iter().any(|s| s.contains("ON CONFLICT")));
        assert!(!log.iter().any(|s| s.contains("bot_cooldown") && s.contains("INSERT INTO")));
        assert!(!log.iter().any(|s| s.contains("notification")));
    }

    #[tokio::test]
    async fn test_disabled_globally() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[global_row(100, 0, false)]])
                .into_connection(),
        );

        let report = service(&db, BotsConfig::default())
            .run("user1", Utc::now())
            .await
            .unwrap();
        assert_eq!(report.scanned, 0);
        assert!(report.liked_by.is_empty());
    }

    #[tokio::test]
    async fn test_missing_global_row_disables_loop() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<bot_global_settings::Model>::new()])
                .into_connection(),
        );

        let report = service(&db, BotsConfig::default())
            .run("user1", Utc::now())
            .await
            .unwrap();
        assert!(report.liked_by.is_empty());
    }
}
