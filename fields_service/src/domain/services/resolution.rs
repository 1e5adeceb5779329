//! Effective field resolution for an issue

use std::collections::HashMap;

use uuid::Uuid;

use super::FieldServiceImpl;
use crate::domain::{
    error::{FieldError, Result},
    models::{
        ContextWithDefinition, EffectiveField, FieldOption, FieldValue, OptionSummary,
        StoredFieldValue,
        precedence::{fallback_value, select_effective_contexts},
    },
    ports::{FieldStorage, IssueDirectory, PriorityDirectory, UserDirectory},
};

/// Catalog summaries for an option field, plus a placeholder for every referenced id the
/// catalog no longer contains.
fn option_summaries(
    issue_id: Uuid,
    selected: &ContextWithDefinition,
    catalog: &[FieldOption],
    value: Option<&FieldValue>,
) -> Vec<OptionSummary> {
    let mut summaries: Vec<OptionSummary> = catalog.iter().map(OptionSummary::from).collect();

    let referenced = value.map(FieldValue::option_ids).unwrap_or_default();
    for option_id in referenced {
        if summaries.iter().any(|s| s.id == option_id) {
            continue;
        }
        tracing::warn!(
            issue_id = %issue_id,
            field_definition_id = %selected.definition.id,
            field_key = %selected.definition.key,
            option_id = %option_id,
            "stale option reference, showing placeholder"
        );
        summaries.push(OptionSummary::unknown(option_id));
    }
    summaries
}

/// The stored row if its value still matches the definition's data type.
/// A row of another type is treated as absent.
fn stored_row_for<'a>(
    issue_id: Uuid,
    selected: &ContextWithDefinition,
    stored: Option<&'a StoredFieldValue>,
) -> Option<&'a StoredFieldValue> {
    let row = stored?;
    match &row.value {
        Some(value) if value.data_type() != selected.definition.data_type => {
            tracing::warn!(
                issue_id = %issue_id,
                field_key = %selected.definition.key,
                stored_type = %value.data_type(),
                data_type = %selected.definition.data_type,
                "stored value does not match field data type, ignoring it"
            );
            None
        }
        _ => Some(row),
    }
}

fn effective_field(
    issue_id: Uuid,
    selected: ContextWithDefinition,
    stored: Option<&StoredFieldValue>,
    catalog: Option<&Vec<FieldOption>>,
) -> EffectiveField {
    let data_type = selected.definition.data_type;
    let constraints = &selected.context.constraints;

    let value = fallback_value(
        data_type,
        stored_row_for(issue_id, &selected, stored),
        constraints,
    );

    let options = data_type.is_option_type().then(|| {
        option_summaries(
            issue_id,
            &selected,
            catalog.map(Vec::as_slice).unwrap_or_default(),
            value.as_ref(),
        )
    });

    EffectiveField {
        id: selected.definition.id,
        key: selected.definition.key.clone(),
        name: selected.definition.name.clone(),
        data_type,
        required: constraints.required,
        visible: constraints.visible,
        editable: constraints.editable,
        order: constraints.display_order,
        options,
        value,
        default_value: constraints.default_value.clone(),
        min: constraints.min,
        max: constraints.max,
        regex: constraints.regex.clone(),
    }
}

#[tracing::instrument(err, skip(service))]
pub(super) async fn resolve_issue_fields<S, I, U, P>(
    service: &FieldServiceImpl<S, I, U, P>,
    issue_id: Uuid,
) -> Result<Vec<EffectiveField>>
where
    S: FieldStorage,
    I: IssueDirectory,
    U: UserDirectory,
    P: PriorityDirectory,
    anyhow::Error: From<S::Error>,
{
    let issue = service.issue_core(issue_id).await?;

    let candidates = service
        .storage
        .find_applicable_contexts(issue.project_id, issue.issue_type_id)
        .await
        .map_err(FieldError::internal)?;
    let selected = select_effective_contexts(candidates);
    if selected.is_empty() {
        return Ok(Vec::new());
    }

    let stored: HashMap<Uuid, StoredFieldValue> = service
        .storage
        .get_issue_field_values(issue_id)
        .await
        .map_err(FieldError::internal)?
        .into_iter()
        .map(|v| (v.field_definition_id, v))
        .collect();

    let option_field_ids: Vec<Uuid> = selected
        .iter()
        .filter(|s| s.definition.data_type.is_option_type())
        .map(|s| s.definition.id)
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

    let mut fields: Vec<EffectiveField> = selected
        .into_iter()
        .map(|s| {
            let definition_id = s.definition.id;
            effective_field(
                issue_id,
                s,
                stored.get(&definition_id),
                catalogs.get(&definition_id),
            )
        })
        .collect();

    // stable, so equal orders keep key order
    fields.sort_by_key(|f| f.order);

    tracing::debug!(issue_id = %issue_id, fields = fields.len(), "resolved issue fields");
    Ok(fields)
}
