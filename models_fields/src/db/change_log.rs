//! Database layer change log models.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::service::{ChangeItem, ChangeLogEntry};

/// Row of `field_change_logs`.
#[derive(Debug, Clone)]
pub struct ChangeLogRow {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Row of `field_change_items`.
#[derive(Debug, Clone)]
pub struct ChangeItemRow {
    pub change_log_id: Uuid,
    pub position: i32,
    pub field_key: String,
    pub before_value: Option<String>,
    pub after_value: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ChangeLogRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        Ok(ChangeLogRow {
            id: row.try_get("id")?,
            issue_id: row.try_get("issue_id")?,
            actor_id: row.try_get("actor_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ChangeItemRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        Ok(ChangeItemRow {
            change_log_id: row.try_get("change_log_id")?,
            position: row.try_get("position")?,
            field_key: row.try_get("field_key")?,
            before_value: row.try_get("before_value")?,
            after_value: row.try_get("after_value")?,
        })
    }
}

impl ChangeLogRow {
    /// Attach the items belonging to this log; items must already be in position order
    pub fn into_entry(self, items: Vec<ChangeItemRow>) -> ChangeLogEntry {
        ChangeLogEntry {
            id: self.id,
            issue_id: self.issue_id,
            actor_id: self.actor_id,
            created_at: self.created_at,
            items: items
                .into_iter()
                .map(|item| ChangeItem {
                    field_key: item.field_key,
                    before: item.before_value,
                    after: item.after_value,
                })
                .collect(),
        }
    }
}
