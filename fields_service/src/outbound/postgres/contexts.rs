//! Field context storage operations

use std::collections::HashMap;

use models_fields::db::FieldContextRow;
use models_fields::service::{ContextWithDefinition, FieldContext, FieldDefinition};
use sqlx::PgPool;
use uuid::Uuid;

use super::FieldsStorageError;
use super::definitions::get_field_definitions_by_ids;

const CONTEXT_COLUMNS: &str = "c.id, c.field_definition_id, c.project_id, c.issue_type_id, \
     c.required, c.visible, c.editable, c.display_order, c.default_option_id, c.default_value, \
     c.min_value, c.max_value, c.regex, c.created_at, c.updated_at";

#[tracing::instrument(err, skip(pool))]
pub async fn create_field_context(
    pool: &PgPool,
    context: FieldContext,
) -> Result<FieldContext, FieldsStorageError> {
    let c = &context.constraints;
    let row = sqlx::query_as::<_, FieldContextRow>(&format!(
        r#"
        INSERT INTO field_contexts AS c (
            id, field_definition_id, project_id, issue_type_id,
            required, visible, editable, display_order,
            default_option_id, default_value, min_value, max_value, regex,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING {CONTEXT_COLUMNS}
        "#
    ))
    .bind(context.id)
    .bind(context.field_definition_id)
    .bind(context.scope.project_id)
    .bind(context.scope.issue_type_id)
    .bind(c.required)
    .bind(c.visible)
    .bind(c.editable)
    .bind(c.display_order)
    .bind(c.default_option_id)
    .bind(&c.default_value)
    .bind(c.min)
    .bind(c.max)
    .bind(&c.regex)
    .bind(context.created_at)
    .bind(context.updated_at)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

pub async fn get_field_context(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<FieldContext>, FieldsStorageError> {
    let row = sqlx::query_as::<_, FieldContextRow>(&format!(
        "SELECT {CONTEXT_COLUMNS} FROM field_contexts c WHERE c.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}

pub async fn list_field_contexts(
    pool: &PgPool,
    field_definition_id: Uuid,
) -> Result<Vec<FieldContext>, FieldsStorageError> {
    let rows = sqlx::query_as::<_, FieldContextRow>(&format!(
        "SELECT {CONTEXT_COLUMNS} FROM field_contexts c WHERE c.field_definition_id = $1 ORDER BY c.id"
    ))
    .bind(field_definition_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Only the constraint columns change; the scope of a context is fixed
#[tracing::instrument(err, skip(pool))]
pub async fn update_field_context(
    pool: &PgPool,
    context: FieldContext,
) -> Result<FieldContext, FieldsStorageError> {
    let c = &context.constraints;
    let row = sqlx::query_as::<_, FieldContextRow>(&format!(
        r#"
        UPDATE field_contexts AS c
        SET required = $2, visible = $3, editable = $4, display_order = $5,
            default_option_id = $6, default_value = $7, min_value = $8, max_value = $9,
            regex = $10, updated_at = $11
        WHERE c.id = $1
        RETURNING {CONTEXT_COLUMNS}
        "#
    ))
    .bind(context.id)
    .bind(c.required)
    .bind(c.visible)
    .bind(c.editable)
    .bind(c.display_order)
    .bind(c.default_option_id)
    .bind(&c.default_value)
    .bind(c.min)
    .bind(c.max)
    .bind(&c.regex)
    .bind(context.updated_at)
    .fetch_optional(pool)
    .await?
    .ok_or(sqlx::Error::RowNotFound)?;

    Ok(row.into())
}

#[tracing::instrument(err, skip(pool))]
pub async fn delete_field_context(pool: &PgPool, id: Uuid) -> Result<bool, FieldsStorageError> {
    let result = sqlx::query("DELETE FROM field_contexts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Contexts matching the scope, joined with their definitions and ordered by definition key
pub async fn find_applicable_contexts(
    pool: &PgPool,
    project_id: Uuid,
    issue_type_id: Uuid,
) -> Result<Vec<ContextWithDefinition>, FieldsStorageError> {
    let rows = sqlx::query_as::<_, FieldContextRow>(&format!(
        r#"
        SELECT {CONTEXT_COLUMNS}
        FROM field_contexts c
        JOIN field_definitions d ON d.id = c.field_definition_id
        WHERE (c.project_id IS NULL OR c.project_id = $1)
          AND (c.issue_type_id IS NULL OR c.issue_type_id = $2)
        ORDER BY d.key, c.id
        "#
    ))
    .bind(project_id)
    .bind(issue_type_id)
    .fetch_all(pool)
    .await?;

    let mut definition_ids: Vec<Uuid> = rows.iter().map(|r| r.field_definition_id).collect();
    definition_ids.dedup();
    let definitions: HashMap<Uuid, FieldDefinition> =
        get_field_definitions_by_ids(pool, &definition_ids)
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let definition = definitions.get(&row.field_definition_id)?.clone();
            Some(ContextWithDefinition {
                context: row.into(),
                definition,
            })
        })
        .collect())
}
