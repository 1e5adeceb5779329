//! Database layer field context model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::service::{FieldConstraints, FieldContext};
use crate::shared::ContextScope;

/// Row of `field_contexts`. Scope and constraints are flattened into columns.
#[derive(Debug, Clone)]
pub struct FieldContextRow {
    pub id: Uuid,
    pub field_definition_id: Uuid,
    pub project_id: Option<Uuid>,
    pub issue_type_id: Option<Uuid>,
    pub required: bool,
    pub visible: bool,
    pub editable: bool,
    pub display_order: i32,
    pub default_option_id: Option<Uuid>,
    pub default_value: Option<String>,
    pub min_value: Option<Decimal>,
    pub max_value: Option<Decimal>,
    pub regex: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for FieldContextRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        Ok(FieldContextRow {
            id: row.try_get("id")?,
            field_definition_id: row.try_get("field_definition_id")?,
            project_id: row.try_get("project_id")?,
            issue_type_id: row.try_get("issue_type_id")?,
            required: row.try_get("required")?,
            visible: row.try_get("visible")?,
            editable: row.try_get("editable")?,
            display_order: row.try_get("display_order")?,
            default_option_id: row.try_get("default_option_id")?,
            default_value: row.try_get("default_value")?,
            min_value: row.try_get("min_value")?,
            max_value: row.try_get("max_value")?,
            regex: row.try_get("regex")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<FieldContextRow> for FieldContext {
    fn from(row: FieldContextRow) -> Self {
        Self {
            id: row.id,
            field_definition_id: row.field_definition_id,
            scope: ContextScope::new(row.project_id, row.issue_type_id),
            constraints: FieldConstraints {
                required: row.required,
                visible: row.visible,
                editable: row.editable,
                display_order: row.display_order,
                default_option_id: row.default_option_id,
                default_value: row.default_value,
                min: row.min_value,
                max: row.max_value,
                regex: row.regex,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
