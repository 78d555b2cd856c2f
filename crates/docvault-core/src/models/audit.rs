use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::document::DocumentStatus;

/// Action recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "audit_action", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Uploaded,
    Updated,
    Deleted,
    StatusChanged,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub document_id: Uuid,
    pub version_id: Option<Uuid>,
    pub action: AuditAction,
    pub actor_id: Uuid,
    #[schema(value_type = Object)]
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct StatusTimelineEntry {
    pub id: Uuid,
    pub document_id: Uuid,
    pub status: DocumentStatus,
    pub changed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Audit entry to append. `version_id` is filled in by the repository when the
/// entry is written alongside a new version.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub action: AuditAction,
    pub actor_id: Uuid,
    pub metadata: JsonValue,
}

impl NewAuditEntry {
    pub fn new(action: AuditAction, actor_id: Uuid, metadata: JsonValue) -> Self {
        Self {
            action,
            actor_id,
            metadata,
        }
    }
}
