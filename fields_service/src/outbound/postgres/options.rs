//! Field option storage operations

use std::collections::HashMap;

use models_fields::db::FieldOptionRow;
use models_fields::service::FieldOption;
use sqlx::PgPool;
use uuid::Uuid;

use super::FieldsStorageError;

const OPTION_COLUMNS: &str =
    "id, field_definition_id, key, value, display_order, created_at, updated_at";

#[tracing::instrument(err, skip(pool))]
pub async fn create_field_option(
    pool: &PgPool,
    option: FieldOption,
) -> Result<FieldOption, FieldsStorageError> {
    let row = sqlx::query_as::<_, FieldOptionRow>(&format!(
        r#"
        INSERT INTO field_options (id, field_definition_id, key, value, display_order, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {OPTION_COLUMNS}
        "#
    ))
    .bind(option.id)
    .bind(option.field_definition_id)
    .bind(&option.key)
    .bind(&option.value)
    .bind(option.display_order)
    .bind(option.created_at)
    .bind(option.updated_at)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

pub async fn get_field_option(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<FieldOption>, FieldsStorageError> {
    let row = sqlx::query_as::<_, FieldOptionRow>(&format!(
        "SELECT {OPTION_COLUMNS} FROM field_options WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}

pub async fn get_field_options(
    pool: &PgPool,
    field_definition_id: Uuid,
) -> Result<Vec<FieldOption>, FieldsStorageError> {
    let rows = sqlx::query_as::<_, FieldOptionRow>(&format!(
        r#"
        SELECT {OPTION_COLUMNS}
        FROM field_options
        WHERE field_definition_id = $1
        ORDER BY display_order, id
        "#
    ))
    .bind(field_definition_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Catalogs of several definitions in one query, grouped by definition
pub async fn get_field_options_for_definitions(
    pool: &PgPool,
    field_definition_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<FieldOption>>, FieldsStorageError> {
    if field_definition_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, FieldOptionRow>(&format!(
        r#"
        SELECT {OPTION_COLUMNS}
        FROM field_options
        WHERE field_definition_id = ANY($1)
        ORDER BY field_definition_id, display_order, id
        "#
    ))
    .bind(field_definition_ids)
    .fetch_all(pool)
    .await?;

    let mut catalogs: HashMap<Uuid, Vec<FieldOption>> = HashMap::new();
    for row in rows {
        catalogs
            .entry(row.field_definition_id)
            .or_default()
            .push(row.into());
    }
    Ok(catalogs)
}

pub async fn get_field_options_by_ids(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<Vec<FieldOption>, FieldsStorageError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, FieldOptionRow>(&format!(
        "SELECT {OPTION_COLUMNS} FROM field_options WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

#[tracing::instrument(err, skip(pool))]
pub async fn update_field_option(
    pool: &PgPool,
    option: FieldOption,
) -> Result<FieldOption, FieldsStorageError> {
    let row = sqlx::query_as::<_, FieldOptionRow>(&format!(
        r#"
        UPDATE field_options
        SET key = $2, value = $3, display_order = $4, updated_at = $5
        WHERE id = $1
        RETURNING {OPTION_COLUMNS}
        "#
    ))
    .bind(option.id)
    .bind(&option.key)
    .bind(&option.value)
    .bind(option.display_order)
    .bind(option.updated_at)
    .fetch_optional(pool)
    .await?
    .ok_or(sqlx::Error::RowNotFound)?;

    Ok(row.into())
}

#[tracing::instrument(err, skip(pool))]
pub async fn delete_field_option(pool: &PgPool, id: Uuid) -> Result<bool, FieldsStorageError> {
    let result = sqlx::query("DELETE FROM field_options WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Context defaults, stored OPTION payloads and MULTI_OPTION rows pointing at the option
pub async fn count_option_references(
    pool: &PgPool,
    option_id: Uuid,
) -> Result<u64, FieldsStorageError> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT
            (SELECT COUNT(*) FROM field_contexts WHERE default_option_id = $1)
          + (SELECT COUNT(*) FROM field_values WHERE json_value ->> 'optionId' = $1::text)
          + (SELECT COUNT(*) FROM field_value_options WHERE option_id = $1)
        "#,
    )
    .bind(option_id)
    .fetch_one(pool)
    .await?;

    Ok(count.max(0) as u64)
}
