//! Domain extensions for models_fields types
//!
//! Constructors and validation rules for the models_fields types. The model crate
//! stays free of business rules, so they live here as free functions.

use chrono::Utc;
use models_fields::service::{
    FieldConstraints, FieldContext, FieldDefinition, FieldOption, FieldValue,
};
use models_fields::shared::{ContextScope, DataType};
use regex::Regex;
use uuid::Uuid;

use super::codec::codec_for;
use super::requests::UpdateContextRequest;

const MAX_NAME_LEN: usize = 100;
const MAX_KEY_LEN: usize = 64;

// ===== Key Helpers =====

/// Derive a machine key from a display name, e.g. "Story Points" -> "story_points"
pub fn field_key_from_name(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !key.is_empty() {
                key.push('_');
            }
            pending_separator = false;
            key.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    if key.is_empty() {
        key.push_str("field");
    } else if key.starts_with(|c: char| c.is_ascii_digit()) {
        key.insert_str(0, "field_");
    }

    key.truncate(MAX_KEY_LEN);
    key
}

/// A key is a lowercase ascii identifier: `[a-z][a-z0-9_]*`, at most 64 chars
pub fn validate_field_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("Field key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LEN {
        return Err(format!("Field key cannot exceed {MAX_KEY_LEN} characters"));
    }
    let mut chars = key.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !starts_with_letter || !rest_ok {
        return Err(format!(
            "Field key '{key}' must start with a lowercase letter and contain only lowercase letters, digits and underscores"
        ));
    }
    Ok(())
}

// ===== FieldDefinition Helpers =====

/// Create a new field definition; the key is derived from the name when not given
pub fn new_field_definition(
    name: String,
    data_type: DataType,
    description: Option<String>,
    key: Option<String>,
) -> FieldDefinition {
    let now = Utc::now();
    let name = name.trim().to_string();
    let key = key
        .map(|k| k.trim().to_string())
        .unwrap_or_else(|| field_key_from_name(&name));
    FieldDefinition {
        id: Uuid::now_v7(),
        key,
        name,
        data_type,
        description: normalize_description(description),
        created_at: now,
        updated_at: now,
    }
}

/// Blank descriptions are stored as absent
pub fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Validate the field definition
pub fn validate_field_definition(def: &FieldDefinition) -> Result<(), String> {
    if def.name.is_empty() {
        return Err("Field name cannot be empty".to_string());
    }

    if def.name.chars().count() > MAX_NAME_LEN {
        return Err(format!("Field name cannot exceed {MAX_NAME_LEN} characters"));
    }

    validate_field_key(&def.key)
}

// ===== FieldOption Helpers =====

/// Create a new field option
pub fn new_field_option(
    field_definition_id: Uuid,
    key: String,
    value: String,
    display_order: i32,
) -> FieldOption {
    let now = Utc::now();
    FieldOption {
        id: Uuid::now_v7(),
        field_definition_id,
        key: key.trim().to_string(),
        value: value.trim().to_string(),
        display_order,
        created_at: now,
        updated_at: now,
    }
}

/// Validate the field option
pub fn validate_field_option(option: &FieldOption) -> Result<(), String> {
    if option.key.is_empty() {
        return Err("Option key cannot be empty".to_string());
    }

    if option.value.is_empty() {
        return Err("Option value cannot be empty".to_string());
    }

    if option.display_order < 0 {
        return Err("Display order cannot be negative".to_string());
    }

    Ok(())
}

/// Order options by display order, then id
pub fn sort_options(options: &mut [FieldOption]) {
    options.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.id.cmp(&b.id))
    });
}

// ===== FieldContext Helpers =====

/// Create a new field context
pub fn new_field_context(
    field_definition_id: Uuid,
    scope: ContextScope,
    constraints: FieldConstraints,
) -> FieldContext {
    let now = Utc::now();
    FieldContext {
        id: Uuid::now_v7(),
        field_definition_id,
        scope,
        constraints: normalize_constraints(constraints),
        created_at: now,
        updated_at: now,
    }
}

fn normalize_constraints(mut constraints: FieldConstraints) -> FieldConstraints {
    constraints.default_value = constraints.default_value.filter(|v| !v.trim().is_empty());
    constraints.regex = constraints.regex.filter(|r| !r.is_empty());
    constraints
}

/// Apply a constraints patch, leaving absent members unchanged
pub fn apply_context_patch(
    constraints: &FieldConstraints,
    patch: UpdateContextRequest,
) -> FieldConstraints {
    let c = constraints.clone();
    normalize_constraints(FieldConstraints {
        required: patch.required.unwrap_or(c.required),
        visible: patch.visible.unwrap_or(c.visible),
        editable: patch.editable.unwrap_or(c.editable),
        display_order: patch.display_order.unwrap_or(c.display_order),
        default_option_id: patch.default_option_id.unwrap_or(c.default_option_id),
        default_value: patch.default_value.unwrap_or(c.default_value),
        min: patch.min.unwrap_or(c.min),
        max: patch.max.unwrap_or(c.max),
        regex: patch.regex.unwrap_or(c.regex),
    })
}

/// Check that a context's constraints fit the definition's data type.
///
/// `options` is the definition's option catalog.
pub fn validate_constraints(
    def: &FieldDefinition,
    constraints: &FieldConstraints,
    options: &[FieldOption],
) -> Result<(), String> {
    let data_type = def.data_type;

    if constraints.display_order < 0 {
        return Err("Display order cannot be negative".to_string());
    }

    if (constraints.min.is_some() || constraints.max.is_some()) && !data_type.supports_bounds() {
        return Err(format!("min/max are only allowed on NUMBER fields, not {data_type}"));
    }
    if let (Some(min), Some(max)) = (constraints.min, constraints.max)
        && min > max
    {
        return Err(format!("min ({min}) cannot exceed max ({max})"));
    }

    if let Some(pattern) = &constraints.regex {
        if !data_type.supports_regex() {
            return Err(format!("regex is only allowed on TEXT fields, not {data_type}"));
        }
        Regex::new(pattern).map_err(|e| format!("Invalid regex '{pattern}': {e}"))?;
    }

    if let Some(raw) = &constraints.default_value {
        if !data_type.supports_default_value() {
            return Err(format!(
                "defaultValue is only allowed on TEXT and NUMBER fields, not {data_type}"
            ));
        }
        let value = codec_for(data_type)
            .normalize(&serde_json::Value::String(raw.clone()))
            .map_err(|e| format!("Invalid defaultValue: {e}"))?;
        if let Some(value) = &value {
            check_bounds_and_pattern(constraints, value)
                .map_err(|e| format!("Invalid defaultValue: {e}"))?;
        }
    }

    if let Some(option_id) = constraints.default_option_id {
        if !data_type.is_option_type() {
            return Err(format!(
                "defaultOptionId is only allowed on OPTION and MULTI_OPTION fields, not {data_type}"
            ));
        }
        if !options.iter().any(|o| o.id == option_id) {
            return Err(format!(
                "Default option {option_id} does not belong to field '{}'",
                def.key
            ));
        }
    }

    Ok(())
}

// ===== FieldValue Helpers =====

/// Check a normalized value against the governing context's constraints
pub fn check_value_constraints(
    def: &FieldDefinition,
    constraints: &FieldConstraints,
    value: Option<&FieldValue>,
) -> Result<(), String> {
    if !constraints.editable {
        return Err(format!("Field '{}' is not editable", def.key));
    }

    match value {
        None if constraints.required => Err(format!("Field '{}' is required", def.key)),
        Some(v) if constraints.required && v.is_empty() => {
            Err(format!("Field '{}' is required", def.key))
        }
        Some(v) => check_bounds_and_pattern(constraints, v)
            .map_err(|e| format!("Field '{}': {e}", def.key)),
        None => Ok(()),
    }
}

fn check_bounds_and_pattern(
    constraints: &FieldConstraints,
    value: &FieldValue,
) -> Result<(), String> {
    match value {
        FieldValue::Number(n) => {
            if let Some(min) = constraints.min
                && *n < min
            {
                return Err(format!("value {n} is below the minimum {min}"));
            }
            if let Some(max) = constraints.max
                && *n > max
            {
                return Err(format!("value {n} is above the maximum {max}"));
            }
            Ok(())
        }
        FieldValue::Text(s) => match &constraints.regex {
            Some(pattern) => {
                let re = Regex::new(pattern).map_err(|e| format!("invalid regex: {e}"))?;
                if re.is_match(s) {
                    Ok(())
                } else {
                    Err(format!("value does not match pattern '{pattern}'"))
                }
            }
            None => Ok(()),
        },
        _ => Ok(()),
    }
}

/// Every option id in the value must belong to the definition's catalog
pub fn check_option_membership(
    def: &FieldDefinition,
    value: Option<&FieldValue>,
    options: &[FieldOption],
) -> Result<(), String> {
    let Some(value) = value else {
        return Ok(());
    };
    for option_id in value.option_ids() {
        if !options.iter().any(|o| o.id == option_id) {
            return Err(format!(
                "Option {option_id} does not belong to field '{}'",
                def.key
            ));
        }
    }
    Ok(())
}
