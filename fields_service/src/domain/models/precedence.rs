//! Context precedence and default value fallback.

use std::cmp::Reverse;
use std::collections::HashMap;

use models_fields::service::{
    ContextWithDefinition, FieldConstraints, FieldContext, FieldValue, StoredFieldValue,
};
use models_fields::shared::DataType;
use uuid::Uuid;

use super::codec::codec_for;

/// Sort key of a candidate context: more specific scope first, then lowest order, then lowest id.
fn precedence_key(context: &FieldContext) -> (Reverse<u8>, i32, Uuid) {
    (
        Reverse(context.scope.specificity()),
        context.constraints.display_order,
        context.id,
    )
}

/// Keep exactly one context per field definition.
///
/// The surviving contexts keep the relative order in which their definitions first
/// appear in `candidates` (definition key order when fed from `find_applicable`).
pub fn select_effective_contexts(
    candidates: Vec<ContextWithDefinition>,
) -> Vec<ContextWithDefinition> {
    let mut first_seen: Vec<Uuid> = Vec::new();
    let mut best: HashMap<Uuid, ContextWithDefinition> = HashMap::new();

    for candidate in candidates {
        let definition_id = candidate.definition.id;
        match best.get(&definition_id) {
            None => {
                first_seen.push(definition_id);
                best.insert(definition_id, candidate);
            }
            Some(current)
                if precedence_key(&candidate.context) < precedence_key(&current.context) =>
            {
                tracing::debug!(
                    field_definition_id = %definition_id,
                    replaced_context_id = %current.context.id,
                    context_id = %candidate.context.id,
                    "more specific context takes precedence"
                );
                best.insert(definition_id, candidate);
            }
            Some(_) => {}
        }
    }

    first_seen
        .into_iter()
        .filter_map(|definition_id| best.remove(&definition_id))
        .collect()
}

/// The default a context supplies when nothing is stored
pub fn context_default(data_type: DataType, constraints: &FieldConstraints) -> Option<FieldValue> {
    match data_type {
        DataType::SingleOption => constraints.default_option_id.map(FieldValue::SingleOption),
        DataType::MultiOption => constraints
            .default_option_id
            .map(|id| FieldValue::MultiOption(vec![id])),
        DataType::Text | DataType::Number => constraints
            .default_value
            .as_ref()
            .and_then(|raw| {
                codec_for(data_type)
                    .normalize(&serde_json::Value::String(raw.clone()))
                    .ok()
            })
            .flatten(),
        DataType::Bool | DataType::Date | DataType::Datetime | DataType::User => None,
    }
}

/// Value shown for a field, in precedence order:
/// 1. the stored row, even when it holds null or an empty selection
/// 2. the context default, only when the issue has no row for the field
/// 3. nothing (MULTI_OPTION: an empty list)
pub fn fallback_value(
    data_type: DataType,
    stored: Option<&StoredFieldValue>,
    constraints: &FieldConstraints,
) -> Option<FieldValue> {
    let value = match stored {
        Some(row) => row.value.clone(),
        None => context_default(data_type, constraints),
    };
    match (data_type, value) {
        (DataType::MultiOption, None) => Some(FieldValue::MultiOption(Vec::new())),
        (_, value) => value,
    }
}

/// Null or an empty selection
pub fn is_blank(value: Option<&FieldValue>) -> bool {
    value.is_none_or(FieldValue::is_empty)
}
