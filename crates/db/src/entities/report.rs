//! User report entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ReportStatus {
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "resolved")]
    Resolved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Report model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// The user who submitted the report.
    pub reporter_id: String,
    /// The user being reported.
    pub reported_id: String,
    /// Reason given by the reporter.
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    /// Current status of the report.
    pub status: ReportStatus,
    /// Moderator who handled the report.
    pub resolved_by: Option<String>,
    /// When the report was created.
    pub created_at: DateTimeWithTimeZone,
    /// When the report was resolved.
    pub resolved_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
