//! Service layer field option model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display value used when a stored value references an option that no longer exists.
pub const UNKNOWN_OPTION_LABEL: &str = "Unknown option";

/// A selectable value owned by an OPTION or MULTI_OPTION field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOption {
    pub id: Uuid,
    pub field_definition_id: Uuid,
    /// Short code
    pub key: String,
    /// Display text
    pub value: String,
    /// Presentation order, not required to be unique
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The `{id, key, value}` projection of an option carried on an effective field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSummary {
    pub id: Uuid,
    pub key: String,
    pub value: String,
    /// Set when the entry stands in for a stale reference
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unknown: bool,
}

impl OptionSummary {
    /// Placeholder for a referenced option id that is missing from the catalog
    pub fn unknown(id: Uuid) -> Self {
        Self {
            id,
            key: String::new(),
            value: UNKNOWN_OPTION_LABEL.to_string(),
            unknown: true,
        }
    }
}

impl From<&FieldOption> for OptionSummary {
    fn from(option: &FieldOption) -> Self {
        Self {
            id: option.id,
            key: option.key.clone(),
            value: option.value.clone(),
            unknown: false,
        }
    }
}
