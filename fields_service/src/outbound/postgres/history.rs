//! Change log storage operations

use std::collections::HashMap;

use models_fields::db::{ChangeItemRow, ChangeLogRow};
use models_fields::service::ChangeLogEntry;
use sqlx::PgPool;
use uuid::Uuid;

use super::FieldsStorageError;

/// Change log of an issue, newest first
pub async fn list_change_log(
    pool: &PgPool,
    issue_id: Uuid,
) -> Result<Vec<ChangeLogEntry>, FieldsStorageError> {
    let logs = sqlx::query_as::<_, ChangeLogRow>(
        r#"
        SELECT id, issue_id, actor_id, created_at
        FROM field_change_logs
        WHERE issue_id = $1
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(issue_id)
    .fetch_all(pool)
    .await?;

    if logs.is_empty() {
        return Ok(Vec::new());
    }

    let log_ids: Vec<Uuid> = logs.iter().map(|l| l.id).collect();
    let item_rows = sqlx::query_as::<_, ChangeItemRow>(
        r#"
        SELECT change_log_id, position, field_key, before_value, after_value
        FROM field_change_items
        WHERE change_log_id = ANY($1)
        ORDER BY change_log_id, position
        "#,
    )
    .bind(&log_ids)
    .fetch_all(pool)
    .await?;

    let mut items: HashMap<Uuid, Vec<ChangeItemRow>> = HashMap::new();
    for row in item_rows {
        items.entry(row.change_log_id).or_default().push(row);
    }

    Ok(logs
        .into_iter()
        .map(|log| {
            let log_items = items.remove(&log.id).unwrap_or_default();
            log.into_entry(log_items)
        })
        .collect())
}
