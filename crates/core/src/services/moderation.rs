//! Report intake and threshold-driven moderation.

use std::collections::BTreeMap;

use amora_common::{AppError, AppResult, IdGenerator};
use amora_db::{
    entities::{
        notification::NotificationKind,
        report::{self, ReportStatus},
    },
    repositories::{ModerationRepository, UserRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use super::audit::AuditService;

/// Report counts that trigger automatic action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub hide: u64,
    pub ban: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { hide: 3, ban: 7 }
    }
}

/// What the engine does to a reported user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationVerdict {
    None,
    Hide,
    Ban,
}

/// Map a pending-report count to a verdict.
#[must_use]
pub const fn classify(count: u64, thresholds: &Thresholds) -> ModerationVerdict {
    if count >= thresholds.ban {
        ModerationVerdict::Ban
    } else if count >= thresholds.hide {
        ModerationVerdict::Hide
    } else {
        ModerationVerdict::None
    }
}

/// What one run changed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationRunReport {
    pub hidden: Vec<String>,
    pub banned: Vec<String>,
}

/// Input for filing a report.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportInput {
    pub reported_id: String,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

/// Input for resolving a report.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveReportInput {
    pub report_id: String,
    pub resolution: ReportStatus,
}

/// Moderation service.
#[derive(Clone)]
pub struct ModerationService {
    moderation_repo: ModerationRepository,
    user_repo: UserRepository,
    audit: AuditService,
    id_gen: IdGenerator,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub const fn new(
        moderation_repo: ModerationRepository,
        user_repo: UserRepository,
        audit: AuditService,
    ) -> Self {
        Self {
            moderation_repo,
            user_repo,
            audit,
            id_gen: IdGenerator::new(),
        }
    }

    /// File a report against another user.
    pub async fn create_report(
        &self,
        reporter_id: &str,
        input: CreateReportInput,
    ) -> AppResult<report::Model> {
        let reason = input.reason.trim().to_string();
        let input = CreateReportInput { reason, ..input };
        input.validate()?;

        if reporter_id == input.reported_id {
            return Err(AppError::BadRequest("Cannot report yourself".to_string()));
        }
        self.user_repo.get_by_id(&input.reported_id).await?;

        let model = report::ActiveModel {
            id: Set(self.id_gen.generate()),
            reporter_id: Set(reporter_id.to_string()),
            reported_id: Set(input.reported_id),
            reason: Set(input.reason),
            status: Set(ReportStatus::Pending),
            resolved_by: Set(None),
            created_at: Set(Utc::now().into()),
            resolved_at: Set(None),
        };

        self.moderation_repo.create_report(model).await
    }

    /// Close a pending report. Staff only.
    pub async fn resolve_report(
        &self,
        moderator_id: &str,
        input: ResolveReportInput,
    ) -> AppResult<report::Model> {
        let moderator = self.user_repo.get_by_id(moderator_id).await?;
        if !moderator.role.is_staff() {
            return Err(AppError::Forbidden(
                "Only moderators can resolve reports".to_string(),
            ));
        }
        if input.resolution == ReportStatus::Pending {
            return Err(AppError::BadRequest(
                "Resolution must be resolved or rejected".to_string(),
            ));
        }

        let report = self.moderation_repo.get_report(&input.report_id).await?;
        if report.status != ReportStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Report {} is already closed",
                report.id
            )));
        }

        let mut active: report::ActiveModel = report.into();
        active.status = Set(input.resolution);
        active.resolved_by = Set(Some(moderator_id.to_string()));
        active.resolved_at = Set(Some(Utc::now().into()));
        let updated = self.moderation_repo.update_report(active).await?;

        self.audit
            .record(
                Some(moderator_id),
                "report.resolve",
                Some(&updated.reported_id),
                json!({ "reportId": updated.id, "status": updated.status }),
            )
            .await;
        Ok(updated)
    }

    /// Pending reports, newest first.
    pub async fn pending_reports(&self, limit: u64, offset: u64) -> AppResult<Vec<report::Model>> {
        self.moderation_repo
            .get_pending_reports(limit.clamp(1, 100), offset)
            .await
    }

    /// Current thresholds, or `None` when automatic moderation is off.
    async fn thresholds(&self) -> AppResult<Option<Thresholds>> {
        let Some(settings) = self.moderation_repo.find_settings().await? else {
            return Ok(Some(Thresholds::default()));
        };
        if !settings.auto_moderation_enabled {
            return Ok(None);
        }
        Ok(Some(Thresholds {
            hide: u64::try_from(settings.max_reports_before_hide.max(1)).unwrap_or(1),
            ban: u64::try_from(settings.max_reports_before_ban.max(1)).unwrap_or(1),
        }))
    }

    /// Re-tally pending reports and hide or ban users over the thresholds.
    ///
    /// Users already in the target state are left alone, so repeating a run
    /// without new reports changes nothing.
    pub async fn run(&self, actor_id: Option<&str>) -> AppResult<ModerationRunReport> {
        let Some(thresholds) = self.thresholds().await? else {
            tracing::debug!("Automatic moderation disabled");
            return Ok(ModerationRunReport::default());
        };

        let mut tally: BTreeMap<String, u64> = BTreeMap::new();
        for reported_id in self.moderation_repo.pending_reported_ids().await? {
            *tally.entry(reported_id).or_default() += 1;
        }

        let flagged: BTreeMap<String, (u64, ModerationVerdict)> = tally
            .into_iter()
            .map(|(id, count)| {
                let verdict = classify(count, &thresholds);
                (id, (count, verdict))
            })
            .filter(|(_, (_, verdict))| *verdict != ModerationVerdict::None)
            .collect();

        let mut report = ModerationRunReport::default();
        if flagged.is_empty() {
            return Ok(report);
        }

        let ids: Vec<String> = flagged.keys().cloned().collect();
        for user in self.user_repo.find_by_ids(&ids).await? {
            let Some(&(count, verdict)) = flagged.get(&user.id) else {
                continue;
            };

            match verdict {
                ModerationVerdict::Ban if !user.is_banned => {
                    self.user_repo.ban(&user.id).await?;
                    self.audit
                        .record(
                            actor_id,
                            "user.auto_ban",
                            Some(&user.id),
                            json!({ "pendingReports": count, "threshold": thresholds.ban }),
                        )
                        .await;
                    self.audit
                        .notify(
                            &user.id,
                            NotificationKind::AccountBanned,
                            "Your account was banned after multiple reports.",
                        )
                        .await;
                    tracing::info!(user_id = %user.id, reports = count, "User auto-banned");
                    report.banned.push(user.id);
                }
                ModerationVerdict::Hide if !user.is_hidden && !user.is_banned => {
                    self.user_repo.hide(&user.id).await?;
                    self.audit
                        .record(
                            actor_id,
                            "user.auto_hide",
                            Some(&user.id),
                            json!({ "pendingReports": count, "threshold": thresholds.hide }),
                        )
                        .await;
                    tracing::info!(user_id = %user.id, reports = count, "User auto-hidden");
                    report.hidden.push(user.id);
                }
                _ => {}
            }
        }

        report.banned.sort();
        report.hidden.sort();
        Ok(report)
    }
}
