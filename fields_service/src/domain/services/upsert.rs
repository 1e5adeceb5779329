//! Batch upsert of raw field values on an issue

use std::collections::HashMap;

use uuid::Uuid;

use super::FieldServiceImpl;
use crate::domain::{
    error::{FieldError, Result},
    models::{
        ChangeItem, ChangeLogEntry, FieldConstraints, FieldDefinition, FieldOption, FieldUpdate,
        FieldValue, FieldWrite, StoredFieldValue, UpsertFieldsRequest, UpsertFieldsResponse,
        codec::{codec_for, history_payload},
        extensions::{check_option_membership, check_value_constraints},
        precedence::{fallback_value, is_blank, select_effective_contexts},
    },
    ports::{FieldStorage, IssueDirectory, PriorityDirectory, UserDirectory},
};

/// Everything needed to validate one batch, loaded up front
struct BatchScope {
    definitions: HashMap<Uuid, FieldDefinition>,
    constraints: HashMap<Uuid, FieldConstraints>,
    catalogs: HashMap<Uuid, Vec<FieldOption>>,
    current: HashMap<Uuid, StoredFieldValue>,
}

impl BatchScope {
    /// The issue's row for the field; a row holding another data type counts as absent
    fn row(&self, definition: &FieldDefinition) -> Option<&StoredFieldValue> {
        self.current.get(&definition.id).filter(|row| {
            row.value
                .as_ref()
                .is_none_or(|v| v.data_type() == definition.data_type)
        })
    }

    /// The value resolution currently shows for the field
    fn shown_value(&self, definition: &FieldDefinition) -> Option<FieldValue> {
        fallback_value(
            definition.data_type,
            self.row(definition),
            self.constraints
                .get(&definition.id)
                .unwrap_or(&FieldConstraints::default()),
        )
    }

    /// Whether writing `value` leaves both the stored row and the shown value untouched.
    /// Without a row, only a blank write over a blank shown value is a no-op; anything
    /// else creates the row, so a default can be cleared or pinned.
    fn is_unchanged(
        &self,
        definition: &FieldDefinition,
        shown: Option<&FieldValue>,
        value: Option<&FieldValue>,
    ) -> bool {
        match self.row(definition) {
            Some(_) => shown == value,
            None => is_blank(value) && is_blank(shown),
        }
    }
}

/// Normalize one raw value and check it against the field's rules
fn prepare_write(
    scope: &BatchScope,
    definition: &FieldDefinition,
    update: &FieldUpdate,
) -> Result<Option<FieldValue>> {
    let value = codec_for(definition.data_type)
        .normalize(&update.raw_value)
        .map_err(|e| FieldError::ValidationError(format!("Field '{}': {e}", definition.key)))?;

    if let Some(constraints) = scope.constraints.get(&definition.id) {
        check_value_constraints(definition, constraints, value.as_ref())
            .map_err(FieldError::ValidationError)?;
    }

    if definition.data_type.is_option_type() {
        let catalog = scope
            .catalogs
            .get(&definition.id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        check_option_membership(definition, value.as_ref(), catalog)
            .map_err(FieldError::ValidationError)?;
    }

    Ok(value)
}

#[tracing::instrument(
    err,
    skip(service, request),
    fields(issue_id = %request.issue_id, actor_id = %request.actor_id, updates = request.updates.len())
)]
pub(super) async fn upsert_fields<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    request: UpsertFieldsRequest,
) -> Result<UpsertFieldsResponse>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    let issue_id = request.issue_id;
    let issue = service.issue_core(issue_id).await?;

    // Definitions referenced by the batch, in one call
    let mut requested_ids: Vec<Uuid> = Vec::with_capacity(request.updates.len());
    for update in &request.updates {
        if !requested_ids.contains(&update.field_definition_id) {
            requested_ids.push(update.field_definition_id);
        }
    }
    let definitions: HashMap<Uuid, FieldDefinition> = service
        .storage
        .get_field_definitions_by_ids(&requested_ids)
        .await
        .map_err(FieldError::internal)?
        .into_iter()
        .map(|d| (d.id, d))
        .collect();

    let mut skipped = Vec::new();
    for id in &requested_ids {
        if !definitions.contains_key(id) {
            tracing::warn!(
                issue_id = %issue_id,
                field_definition_id = %id,
                "skipped_unknown_field"
            );
            skipped.push(*id);
        }
    }

    // Current values, governing contexts and option catalogs
    let current: HashMap<Uuid, StoredFieldValue> = service
        .storage
        .get_issue_field_values(issue_id)
        .await
        .map_err(FieldError::internal)?
        .into_iter()
        .map(|v| (v.field_definition_id, v))
        .collect();

    let constraints: HashMap<Uuid, FieldConstraints> = select_effective_contexts(
        service
            .storage
            .find_applicable_contexts(issue.project_id, issue.issue_type_id)
            .await
            .map_err(FieldError::internal)?,
    )
    .into_iter()
    .filter(|s| definitions.contains_key(&s.definition.id))
    .map(|s| (s.definition.id, s.context.constraints))
    .collect();

    let option_field_ids: Vec<Uuid> = definitions
        .values()
        .filter(|d| d.data_type.is_option_type())
        .map(|d| d.id)
        .collect();
    let catalogs = if option_field_ids.is_empty() {
        HashMap::new()
    } else {
        service
            .storage
            .get_field_options_for_definitions(&option_field_ids)
            .await
            .map_err(FieldError::internal)?
    };

    let scope = BatchScope {
        definitions,
        constraints,
        catalogs,
        current,
    };

    // Normalize and validate everything before touching storage.
    // A field listed twice keeps its last value.
    let mut prepared: Vec<(Uuid, Option<FieldValue>)> = Vec::new();
    for update in &request.updates {
        let Some(definition) = scope.definitions.get(&update.field_definition_id) else {
            continue;
        };
        let value = prepare_write(&scope, definition, update)?;
        match prepared.iter_mut().find(|entry| entry.0 == definition.id) {
            Some(entry) => entry.1 = value,
            None => prepared.push((definition.id, value)),
        }
    }

    let mut writes = Vec::new();
    let mut items = Vec::new();
    for (definition_id, value) in prepared {
        let Some(definition) = scope.definitions.get(&definition_id) else {
            continue;
        };
        let shown = scope.shown_value(definition);
        if scope.is_unchanged(definition, shown.as_ref(), value.as_ref()) {
            continue;
        }

        // history only records what a reader sees change
        if shown != value {
            items.push(ChangeItem {
                field_key: definition.key.clone(),
                before: shown.as_ref().map(history_payload),
                after: value.as_ref().map(history_payload),
            });
        }
        writes.push(FieldWrite {
            field_definition_id: definition_id,
            data_type: definition.data_type,
            value,
        });
    }

    if writes.is_empty() {
        tracing::debug!(issue_id = %issue_id, "upsert changed nothing");
        return Ok(UpsertFieldsResponse {
            written: 0,
            skipped,
            change_log_id: None,
        });
    }

    let change_log =
        (!items.is_empty()).then(|| ChangeLogEntry::new(issue_id, request.actor_id, items));
    let change_log_id = change_log.as_ref().map(|entry| entry.id);
    let written = writes.len();

    service
        .storage
        .apply_field_writes(issue_id, writes, change_log)
        .await
        .map_err(FieldError::internal)?;

    tracing::info!(
        issue_id = %issue_id,
        written,
        skipped = skipped.len(),
        change_log_id = ?change_log_id,
        "upserted issue fields"
    );

    Ok(UpsertFieldsResponse {
        written,
        skipped,
        change_log_id,
    })
}
