//! Audit log repository.

use std::sync::Arc;

use crate::entities::audit_log;
use amora_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DatabaseConnection};

/// Append-only audit log.
#[derive(Clone)]
pub struct AuditLogRepository {
    db: Arc<DatabaseConnection>,
}

impl AuditLogRepository {
    /// Create a new audit log repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append an entry.
    pub async fn create(&self, model: audit_log::ActiveModel) -> AppResult<audit_log::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
