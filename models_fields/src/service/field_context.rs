//! Service layer field context model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FieldDefinition;
use crate::shared::ContextScope;

/// Per-scope constraints and defaults of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConstraints {
    pub required: bool,
    pub visible: bool,
    pub editable: bool,
    /// Presentation order among the fields of one issue
    pub display_order: i32,
    /// Default option for OPTION / MULTI_OPTION, by reference
    pub default_option_id: Option<Uuid>,
    /// Default for TEXT / NUMBER, in the same string form the upsert accepts
    pub default_value: Option<String>,
    /// Inclusive lower bound for NUMBER
    pub min: Option<Decimal>,
    /// Inclusive upper bound for NUMBER
    pub max: Option<Decimal>,
    /// Pattern a TEXT value must match
    pub regex: Option<String>,
}

impl Default for FieldConstraints {
    fn default() -> Self {
        Self {
            required: false,
            visible: true,
            editable: true,
            display_order: 0,
            default_option_id: None,
            default_value: None,
            min: None,
            max: None,
            regex: None,
        }
    }
}

/// A scoping + constraint record binding a field definition to a project/issue-type combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldContext {
    pub id: Uuid,
    pub field_definition_id: Uuid,
    pub scope: ContextScope,
    pub constraints: FieldConstraints,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A context together with the definition it configures.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextWithDefinition {
    pub context: FieldContext,
    pub definition: FieldDefinition,
}
