//! Best-effort audit trail and user notifications.
//!
//! Nothing written here is allowed to fail the caller: errors are logged and
//! dropped.

use amora_common::IdGenerator;
use amora_db::{
    entities::{audit_log, notification::{self, NotificationKind}},
    repositories::{AuditLogRepository, NotificationRepository},
};
use chrono::Utc;
use sea_orm::Set;
use serde_json::Value;

/// Writer for audit log entries and notifications.
#[derive(Clone)]
pub struct AuditService {
    audit_repo: AuditLogRepository,
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

impl AuditService {
    /// Create a new audit service.
    #[must_use]
    pub const fn new(
        audit_repo: AuditLogRepository,
        notification_repo: NotificationRepository,
    ) -> Self {
        Self {
            audit_repo,
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Append an audit log entry.
    pub async fn record(
        &self,
        actor_id: Option<&str>,
        action: &str,
        target_id: Option<&str>,
        details: Value,
    ) {
        let model = audit_log::ActiveModel {
            id: Set(self.id_gen.generate()),
            actor_id: Set(actor_id.map(ToString::to_string)),
            action: Set(action.to_string()),
            target_id: Set(target_id.map(ToString::to_string)),
            details: Set(details),
            created_at: Set(Utc::now().into()),
        };

        if let Err(e) = self.audit_repo.create(model).await {
            tracing::warn!(error = %e, action = action, "Failed to write audit log entry");
        }
    }

    /// Send an in-app notification.
    pub async fn notify(&self, user_id: &str, kind: NotificationKind, body: &str) {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            kind: Set(kind),
            body: Set(body.to_string()),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
        };

        if let Err(e) = self.notification_repo.create(model).await {
            tracing::warn!(error = %e, user_id = %user_id, "Failed to create notification");
        }
    }
}
