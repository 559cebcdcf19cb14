//! Coin economy ledger.
//!
//! Balances live on the user row; every movement is also appended to the
//! ledger table. The balance check and the debit happen in one conditional
//! UPDATE, so concurrent spends cannot overdraw a non-premium account.
//! Premium debits are capped at the current balance under a row lock.

use amora_common::{AppError, AppResult, IdGenerator, config::EconomyConfig};
use amora_db::{
    entities::{
        coin_transaction::{self, TransactionKind},
        user,
    },
    repositories::{LedgerRepository, UserRepository},
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, Set};
use serde::Serialize;
use serde_json::Value;

use super::feature_flags::FeatureFlagService;

/// Result of a spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendOutcome {
    /// Coins actually charged. Zero for premium-free actions.
    pub charged: i64,
    /// Balance after the spend.
    pub balance: i64,
}

/// Result of a credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnOutcome {
    pub credited: i64,
    pub balance: i64,
}

/// Economy service.
#[derive(Clone)]
pub struct EconomyService {
    user_repo: UserRepository,
    ledger_repo: LedgerRepository,
    feature_flags: FeatureFlagService,
    premium_free_reasons: Vec<String>,
    id_gen: IdGenerator,
}

impl EconomyService {
    /// Create a new economy service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        ledger_repo: LedgerRepository,
        feature_flags: FeatureFlagService,
        config: &EconomyConfig,
    ) -> Self {
        Self {
            user_repo,
            ledger_repo,
            feature_flags,
            premium_free_reasons: config.premium_free_reasons.clone(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Whether `reason` costs `user` nothing.
    ///
    /// The reason has to be listed in `economy.premium_free_reasons` and the
    /// user's tier has to carry the `free_<reason>` feature.
    pub async fn is_free_for(&self, user: &user::Model, reason: &str) -> AppResult<bool> {
        if !self.premium_free_reasons.iter().any(|r| r == reason) {
            return Ok(false);
        }
        self.feature_flags
            .user_has_feature(user, &format!("free_{reason}"))
            .await
    }

    /// Spend coins.
    ///
    /// Non-premium users are rejected with [`AppError::InsufficientBalance`]
    /// when the balance does not cover `amount`; nothing is written in that
    /// case. Premium users are never rejected: they are charged at most what
    /// they hold. Reasons free for the user's tier charge nothing at all. The ledger
    /// always records the amount actually charged.
    pub async fn spend(
        &self,
        user_id: &str,
        amount: i64,
        reason: &str,
        metadata: Option<Value>,
    ) -> AppResult<SpendOutcome> {
        if amount <= 0 {
            return Err(AppError::BadRequest(
                "Spend amount must be positive".to_string(),
            ));
        }

        let user = self.user_repo.get_by_id(user_id).await?;

        if self.is_free_for(&user, reason).await? {
            self.log(user_id, 0, TransactionKind::Spend, reason, metadata)
                .await;
            tracing::debug!(user_id = %user_id, reason = %reason, "Free spend for tier");
            return Ok(SpendOutcome {
                charged: 0,
                balance: user.coin_balance,
            });
        }

        let (charged, updated) = if user.is_premium {
            self.user_repo
                .debit_capped(user_id, amount)
                .await?
                .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?
        } else {
            let Some(updated) = self.user_repo.debit(user_id, amount).await? else {
                tracing::debug!(
                    user_id = %user_id,
                    amount = amount,
                    balance = user.coin_balance,
                    "Spend rejected: insufficient balance"
                );
                return Err(AppError::InsufficientBalance {
                    required: amount,
                    available: user.coin_balance,
                });
            };
            (amount, updated)
        };

        self.log(user_id, -charged, TransactionKind::Spend, reason, metadata)
            .await;

        tracing::info!(
            user_id = %user_id,
            amount = amount,
            charged = charged,
            reason = %reason,
            balance = updated.coin_balance,
            "Coins spent"
        );
        Ok(SpendOutcome {
            charged,
            balance: updated.coin_balance,
        })
    }

    /// Credit coins unconditionally.
    pub async fn earn(
        &self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        reason: &str,
        metadata: Option<Value>,
    ) -> AppResult<EarnOutcome> {
        check_credit(amount, kind)?;

        let updated = self
            .user_repo
            .credit(user_id, amount)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

        self.log(user_id, amount, kind, reason, metadata).await;

        tracing::info!(
            user_id = %user_id,
            amount = amount,
            reason = %reason,
            balance = updated.coin_balance,
            "Coins credited"
        );
        Ok(EarnOutcome {
            credited: amount,
            balance: updated.coin_balance,
        })
    }

    /// [`Self::earn`] on `conn`, for credits that must commit or roll back
    /// together. The ledger entry is written on the same connection and a
    /// failure to write it fails the credit.
    pub async fn earn_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        reason: &str,
        metadata: Option<Value>,
    ) -> AppResult<EarnOutcome> {
        check_credit(amount, kind)?;

        let updated = UserRepository::credit_on(conn, user_id, amount)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;
        LedgerRepository::append_on(conn, self.entry(user_id, amount, kind, reason, metadata))
            .await?;

        Ok(EarnOutcome {
            credited: amount,
            balance: updated.coin_balance,
        })
    }

    /// Current balance.
    pub async fn balance(&self, user_id: &str) -> AppResult<i64> {
        Ok(self.user_repo.get_by_id(user_id).await?.coin_balance)
    }

    /// Ledger entries, newest first.
    pub async fn history(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<coin_transaction::Model>> {
        self.ledger_repo.find_by_user(user_id, limit, until_id).await
    }

    fn entry(
        &self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        reason: &str,
        metadata: Option<Value>,
    ) -> coin_transaction::ActiveModel {
        coin_transaction::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            amount: Set(amount),
            kind: Set(kind),
            reason: Set(reason.to_string()),
            metadata: Set(metadata),
            created_at: Set(Utc::now().into()),
        }
    }

    /// Append a ledger entry. The balance change has already happened, so a
    /// failure here is logged and dropped.
    async fn log(
        &self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        reason: &str,
        metadata: Option<Value>,
    ) {
        let entry = self.entry(user_id, amount, kind, reason, metadata);
        if let Err(e) = self.ledger_repo.append(entry).await {
            tracing::warn!(error = %e, user_id = %user_id, amount = amount, "Failed to append ledger entry");
        }
    }
}

fn check_credit(amount: i64, kind: TransactionKind) -> AppResult<()> {
    if amount <= 0 {
        return Err(AppError::BadRequest(
            "Credit amount must be positive".to_string(),
        ));
    }
    if kind == TransactionKind::Spend {
        return Err(AppError::BadRequest(
            "Credits cannot be recorded as spend".to_string(),
        ));
    }
    Ok(())
}
