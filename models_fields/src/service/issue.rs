//! Core projection of an issue, as provided by the issue directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The subset of an issue the field engine needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCore {
    pub id: Uuid,
    pub key: String,
    pub summary: String,
    pub project_id: Uuid,
    pub issue_type_id: Uuid,
    /// Opaque workflow status identifier
    pub status: String,
    pub reporter_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
