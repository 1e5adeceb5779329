//! Database layer field option model.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::service::FieldOption;

/// Row of `field_options`.
#[derive(Debug, Clone)]
pub struct FieldOptionRow {
    pub id: Uuid,
    pub field_definition_id: Uuid,
    pub key: String,
    pub value: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for FieldOptionRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        Ok(FieldOptionRow {
            id: row.try_get("id")?,
            field_definition_id: row.try_get("field_definition_id")?,
            key: row.try_get("key")?,
            value: row.try_get("value")?,
            display_order: row.try_get("display_order")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<FieldOptionRow> for FieldOption {
    fn from(row: FieldOptionRow) -> Self {
        Self {
            id: row.id,
            field_definition_id: row.field_definition_id,
            key: row.key,
            value: row.value,
            display_order: row.display_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
