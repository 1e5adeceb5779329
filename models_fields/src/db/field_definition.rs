//! Database layer field definition model.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::service::FieldDefinition;
use crate::shared::DataType;

/// Row of `field_definitions`.
#[derive(Debug, Clone)]
pub struct FieldDefinitionRow {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub data_type: DataType,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for FieldDefinitionRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        Ok(FieldDefinitionRow {
            id: row.try_get("id")?,
            key: row.try_get("key")?,
            name: row.try_get("name")?,
            data_type: row.try_get("data_type")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<FieldDefinitionRow> for FieldDefinition {
    fn from(row: FieldDefinitionRow) -> Self {
        Self {
            id: row.id,
            key: row.key,
            name: row.name,
            data_type: row.data_type,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
