//! Request models for field engine operations

use models_fields::service::{FieldConstraints, FieldValue};
use models_fields::shared::DataType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to create a field definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFieldRequest {
    pub name: String,
    pub data_type: DataType,
    pub description: Option<String>,
    /// Derived from the name when absent
    pub key: Option<String>,
}

/// Patch of a field definition; absent members are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFieldRequest {
    pub name: Option<String>,
    pub key: Option<String>,
    /// An empty string clears the description
    pub description: Option<String>,
    pub data_type: Option<DataType>,
}

/// Request to create an option on an OPTION / MULTI_OPTION field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOptionRequest {
    pub field_definition_id: Uuid,
    pub key: String,
    pub value: String,
    pub display_order: i32,
}

/// Patch of a field option
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptionRequest {
    pub key: Option<String>,
    pub value: Option<String>,
    pub display_order: Option<i32>,
}

/// Request to attach a field definition to a project / issue-type scope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContextRequest {
    pub field_definition_id: Uuid,
    pub project_id: Option<Uuid>,
    pub issue_type_id: Option<Uuid>,
    pub constraints: FieldConstraints,
}

/// Patch of a context's constraints. The scope of a context cannot change.
///
/// Nullable members use `Some(None)` to clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContextRequest {
    pub required: Option<bool>,
    pub visible: Option<bool>,
    pub editable: Option<bool>,
    pub display_order: Option<i32>,
    pub default_option_id: Option<Option<Uuid>>,
    pub default_value: Option<Option<String>>,
    pub min: Option<Option<Decimal>>,
    pub max: Option<Option<Decimal>>,
    pub regex: Option<Option<String>>,
}

/// One raw value submitted for a field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdate {
    pub field_definition_id: Uuid,
    #[serde(default)]
    pub raw_value: serde_json::Value,
}

/// Batch of raw values to write on one issue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertFieldsRequest {
    pub issue_id: Uuid,
    pub actor_id: Uuid,
    pub updates: Vec<FieldUpdate>,
}

/// A normalized write handed to storage
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    pub field_definition_id: Uuid,
    pub data_type: DataType,
    /// MULTI_OPTION writes always carry `Some(FieldValue::MultiOption(..))`
    pub value: Option<FieldValue>,
}
