//! Field value storage operations

use std::collections::HashMap;

use models_fields::db::{FieldValueOptionRow, FieldValueRow, FieldValueSlots};
use models_fields::service::{ChangeLogEntry, FieldValue, StoredFieldValue};
use models_fields::shared::DataType;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use super::FieldsStorageError;
use crate::domain::models::FieldWrite;

/// Every value row of the issue plus its MULTI_OPTION selections, in two queries
pub async fn get_issue_field_values(
    pool: &PgPool,
    issue_id: Uuid,
) -> Result<Vec<StoredFieldValue>, FieldsStorageError> {
    let rows = sqlx::query(
        r#"
        SELECT v.id, v.issue_id, v.field_definition_id,
               v.text_value, v.number_value, v.bool_value, v.date_value,
               v.datetime_value, v.user_value, v.json_value, v.updated_at,
               d.data_type
        FROM field_values v
        JOIN field_definitions d ON d.id = v.field_definition_id
        WHERE v.issue_id = $1
        "#,
    )
    .bind(issue_id)
    .fetch_all(pool)
    .await?;

    let option_rows = sqlx::query_as::<_, FieldValueOptionRow>(
        r#"
        SELECT o.field_value_id, o.option_id, o.position
        FROM field_value_options o
        JOIN field_values v ON v.id = o.field_value_id
        WHERE v.issue_id = $1
        ORDER BY o.field_value_id, o.position
        "#,
    )
    .bind(issue_id)
    .fetch_all(pool)
    .await?;

    let mut selections: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in option_rows {
        selections
            .entry(row.field_value_id)
            .or_default()
            .push(row.option_id);
    }

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let data_type: DataType = row.try_get("data_type")?;
        let value_row = FieldValueRow::from_row(&row)?;
        let option_ids = selections.remove(&value_row.id).unwrap_or_default();
        values.push(value_row.into_stored(data_type, option_ids)?);
    }
    Ok(values)
}

/// Insert or update the value row and return its id
async fn upsert_value_row(
    tx: &mut Transaction<'_, Postgres>,
    issue_id: Uuid,
    write: &FieldWrite,
) -> Result<Uuid, FieldsStorageError> {
    let slots = FieldValueSlots::from_value(write.value.as_ref())?;

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO field_values (
            id, issue_id, field_definition_id,
            text_value, number_value, bool_value, date_value,
            datetime_value, user_value, json_value, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
        ON CONFLICT (issue_id, field_definition_id) DO UPDATE SET
            text_value = EXCLUDED.text_value,
            number_value = EXCLUDED.number_value,
            bool_value = EXCLUDED.bool_value,
            date_value = EXCLUDED.date_value,
            datetime_value = EXCLUDED.datetime_value,
            user_value = EXCLUDED.user_value,
            json_value = EXCLUDED.json_value,
            updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(issue_id)
    .bind(write.field_definition_id)
    .bind(slots.text_value)
    .bind(slots.number_value)
    .bind(slots.bool_value)
    .bind(slots.date_value)
    .bind(slots.datetime_value)
    .bind(slots.user_value)
    .bind(slots.json_value)
    .fetch_one(&mut **tx)
    .await?;

    Ok(id)
}

/// Replace the whole selection of a MULTI_OPTION value
async fn replace_selection(
    tx: &mut Transaction<'_, Postgres>,
    field_value_id: Uuid,
    option_ids: &[Uuid],
) -> Result<(), FieldsStorageError> {
    sqlx::query("DELETE FROM field_value_options WHERE field_value_id = $1")
        .bind(field_value_id)
        .execute(&mut **tx)
        .await?;

    if option_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO field_value_options (field_value_id, option_id, position)
        SELECT $1, t.option_id, (t.ordinality - 1)::int
        FROM UNNEST($2::uuid[]) WITH ORDINALITY AS t(option_id, ordinality)
        "#,
    )
    .bind(field_value_id)
    .bind(option_ids)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_change_log(
    tx: &mut Transaction<'_, Postgres>,
    entry: &ChangeLogEntry,
) -> Result<(), FieldsStorageError> {
    sqlx::query(
        r#"
        INSERT INTO field_change_logs (id, issue_id, actor_id, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(entry.id)
    .bind(entry.issue_id)
    .bind(entry.actor_id)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;

    for (position, item) in entry.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO field_change_items (change_log_id, position, field_key, before_value, after_value)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id)
        .bind(position as i32)
        .bind(&item.field_key)
        .bind(&item.before)
        .bind(&item.after)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Apply every write and the change log in one transaction
#[tracing::instrument(err, skip(pool, writes, change_log), fields(writes = writes.len()))]
pub async fn apply_field_writes(
    pool: &PgPool,
    issue_id: Uuid,
    writes: Vec<FieldWrite>,
    change_log: Option<ChangeLogEntry>,
) -> Result<(), FieldsStorageError> {
    let mut tx = pool.begin().await?;

    for write in &writes {
        let field_value_id = upsert_value_row(&mut tx, issue_id, write).await?;

        if write.data_type == DataType::MultiOption {
            let option_ids = match &write.value {
                Some(FieldValue::MultiOption(ids)) => ids.as_slice(),
                _ => &[][..],
            };
            replace_selection(&mut tx, field_value_id, option_ids).await?;
        }
    }

    if let Some(entry) = &change_log {
        insert_change_log(&mut tx, entry).await?;
    }

    tx.commit().await?;
    Ok(())
}
