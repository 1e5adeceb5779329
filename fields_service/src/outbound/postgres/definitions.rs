//! Field definition storage operations

use models_fields::db::FieldDefinitionRow;
use models_fields::service::FieldDefinition;
use sqlx::PgPool;
use uuid::Uuid;

use super::FieldsStorageError;

const DEFINITION_COLUMNS: &str = "id, key, name, data_type, description, created_at, updated_at";

#[tracing::instrument(err, skip(pool))]
pub async fn create_field_definition(
    pool: &PgPool,
    definition: FieldDefinition,
) -> Result<FieldDefinition, FieldsStorageError> {
    let row = sqlx::query_as::<_, FieldDefinitionRow>(&format!(
        r#"
        INSERT INTO field_definitions (id, key, name, data_type, description, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {DEFINITION_COLUMNS}
        "#
    ))
    .bind(definition.id)
    .bind(&definition.key)
    .bind(&definition.name)
    .bind(definition.data_type)
    .bind(&definition.description)
    .bind(definition.created_at)
    .bind(definition.updated_at)
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

pub async fn get_field_definition(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<FieldDefinition>, FieldsStorageError> {
    let row = sqlx::query_as::<_, FieldDefinitionRow>(&format!(
        "SELECT {DEFINITION_COLUMNS} FROM field_definitions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}

pub async fn get_field_definition_by_key(
    pool: &PgPool,
    key: &str,
) -> Result<Option<FieldDefinition>, FieldsStorageError> {
    let row = sqlx::query_as::<_, FieldDefinitionRow>(&format!(
        "SELECT {DEFINITION_COLUMNS} FROM field_definitions WHERE key = $1"
    ))
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}

pub async fn get_field_definitions_by_ids(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<Vec<FieldDefinition>, FieldsStorageError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, FieldDefinitionRow>(&format!(
        "SELECT {DEFINITION_COLUMNS} FROM field_definitions WHERE id = ANY($1) ORDER BY key"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn list_field_definitions(
    pool: &PgPool,
) -> Result<Vec<FieldDefinition>, FieldsStorageError> {
    let rows = sqlx::query_as::<_, FieldDefinitionRow>(&format!(
        "SELECT {DEFINITION_COLUMNS} FROM field_definitions ORDER BY key"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

#[tracing::instrument(err, skip(pool))]
pub async fn update_field_definition(
    pool: &PgPool,
    definition: FieldDefinition,
) -> Result<FieldDefinition, FieldsStorageError> {
    let row = sqlx::query_as::<_, FieldDefinitionRow>(&format!(
        r#"
        UPDATE field_definitions
        SET key = $2, name = $3, data_type = $4, description = $5, updated_at = $6
        WHERE id = $1
        RETURNING {DEFINITION_COLUMNS}
        "#
    ))
    .bind(definition.id)
    .bind(&definition.key)
    .bind(&definition.name)
    .bind(definition.data_type)
    .bind(&definition.description)
    .bind(definition.updated_at)
    .fetch_optional(pool)
    .await?
    .ok_or(sqlx::Error::RowNotFound)?;

    Ok(row.into())
}

/// Removes the definition together with its options
#[tracing::instrument(err, skip(pool))]
pub async fn delete_field_definition(pool: &PgPool, id: Uuid) -> Result<bool, FieldsStorageError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM field_options WHERE field_definition_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM field_definitions WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_field_values(
    pool: &PgPool,
    field_definition_id: Uuid,
) -> Result<u64, FieldsStorageError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM field_values WHERE field_definition_id = $1")
            .bind(field_definition_id)
            .fetch_one(pool)
            .await?;
    Ok(count.max(0) as u64)
}

pub async fn count_field_contexts(
    pool: &PgPool,
    field_definition_id: Uuid,
) -> Result<u64, FieldsStorageError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM field_contexts WHERE field_definition_id = $1")
            .bind(field_definition_id)
            .fetch_one(pool)
            .await?;
    Ok(count.max(0) as u64)
}
