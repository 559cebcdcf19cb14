//! Account deletion.

use amora_common::AppResult;
use amora_db::repositories::UserRepository;
use serde_json::json;

use super::audit::AuditService;

/// Account service.
#[derive(Clone)]
pub struct AccountService {
    user_repo: UserRepository,
    audit: AuditService,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, audit: AuditService) -> Self {
        Self { user_repo, audit }
    }

    /// Delete the caller's account. Ledger, likes, unlocks and payments are
    /// removed with it by the foreign keys.
    pub async fn delete(&self, user_id: &str) -> AppResult<()> {
        let user = self.user_repo.get_by_id(user_id).await?;

        // The audit row has no foreign key, so it outlives the user
        self.audit
            .record(
                Some(user_id),
                "account.delete",
                Some(user_id),
                json!({ "username": user.username, "coinBalance": user.coin_balance }),
            )
            .await;
        self.user_repo.delete(user_id).await?;

        tracing::info!(user_id = %user_id, "Account deleted");
        Ok(())
    }
}
