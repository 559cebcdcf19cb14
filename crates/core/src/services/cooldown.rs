//! Cooldown tracking between bots and users.

use amora_common::AppResult;
use amora_db::repositories::CooldownRepository;
use chrono::{DateTime, Duration, Utc};

/// Whether an interaction at `last` still blocks a new one at `now`.
///
/// True while less than `cooldown_hours` have elapsed. A zero cooldown never
/// blocks.
#[must_use]
pub fn cooldown_active(last: DateTime<Utc>, cooldown_hours: i32, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(last) < Duration::hours(i64::from(cooldown_hours))
}

/// Cooldown service.
#[derive(Clone)]
pub struct CooldownService {
    cooldown_repo: CooldownRepository,
}

impl CooldownService {
    /// Create a new cooldown service.
    #[must_use]
    pub const fn new(cooldown_repo: CooldownRepository) -> Self {
        Self { cooldown_repo }
    }

    /// Whether `bot_id` must still wait before acting on `user_id` again.
    ///
    /// A pair with no recorded interaction is never on cooldown.
    pub async fn is_on_cooldown(
        &self,
        bot_id: &str,
        user_id: &str,
        cooldown_hours: i32,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let record = self.cooldown_repo.find(bot_id, user_id).await?;
        Ok(record.is_some_and(|r| {
            cooldown_active(r.last_interaction_at.with_timezone(&Utc), cooldown_hours, now)
        }))
    }

    /// Last interaction time per bot for a batch of bots and one user.
    pub async fn last_interactions(
        &self,
        bot_ids: &[String],
        user_id: &str,
    ) -> AppResult<Vec<(String, DateTime<Utc>)>> {
        let records = self.cooldown_repo.find_for_user(bot_ids, user_id).await?;
        Ok(records
            .into_iter()
            .map(|r| (r.bot_id, r.last_interaction_at.with_timezone(&Utc)))
            .collect())
    }

    /// Record an interaction, overwriting any earlier one for the pair.
    pub async fn record_interaction(
        &self,
        bot_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.cooldown_repo.upsert(bot_id, user_id, now).await?;
        tracing::debug!(bot_id = %bot_id, user_id = %user_id, "Recorded bot interaction");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use amora_db::entities::bot_cooldown;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn record(at: DateTime<Utc>) -> bot_cooldown::Model {
        bot_cooldown::Model {
            bot_id: "bot1".to_string(),
            user_id: "user1".to_string(),
            last_interaction_at: at.into(),
        }
    }

    #[test]
    fn test_cooldown_window_boundaries() {
        let last = Utc::now();

        assert!(cooldown_active(last, 72, last));
        assert!(cooldown_active(last, 72, last + Duration::hours(72) - Duration::seconds(1)));
        assert!(!cooldown_active(last, 72, last + Duration::hours(72)));
        assert!(!cooldown_active(last, 0, last));
    }

    #[tokio::test]
    async fn test_on_cooldown_until_elapsed() {
        let last = Utc::now();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[record(last)], [record(last)]])
                .into_connection(),
        );
        let service = CooldownService::new(CooldownRepository::new(db));

        let soon = last + Duration::hours(1);
        let later = last + Duration::hours(24);
        assert!(service.is_on_cooldown("bot1", "user1", 24, soon).await.unwrap());
        assert!(!service.is_on_cooldown("bot1", "user1", 24, later).await.unwrap());
    }

    #[tokio::test]
    async fn test_no_record_means_no_cooldown() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<bot_cooldown::Model>::new()])
                .into_connection(),
        );
        let service = CooldownService::new(CooldownRepository::new(db));

        assert!(!service
            .is_on_cooldown("bot1", "user1", 72, Utc::now())
            .await
            .unwrap());
    }
}
