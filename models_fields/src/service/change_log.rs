//! Change history records, raw and display-ready.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One field-level before/after pair. Payloads are opaque strings whose shape
/// depends on the field's data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeItem {
    pub field_key: String,
    pub before: Option<String>,
    pub after: Option<String>,
}

/// An immutable record of one actor's edit to one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub items: Vec<ChangeItem>,
}

impl ChangeLogEntry {
    pub fn new(issue_id: Uuid, actor_id: Uuid, items: Vec<ChangeItem>) -> Self {
        Self {
            id: Uuid::now_v7(),
            issue_id,
            actor_id,
            created_at: Utc::now(),
            items,
        }
    }
}

/// "X changed from A to B"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayItem {
    pub field_key: String,
    pub field_name: String,
    pub from: String,
    pub to: String,
}

/// A change log entry with every payload resolved into a human-readable label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub actor: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<DisplayItem>,
}
