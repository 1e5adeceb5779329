//! Service layer field value model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::DataType;

/// The stored value of one field on one issue.
///
/// Exactly one variant per [DataType]; readers never pick a storage slot by hand.
/// Serializes as: {"type": "NUMBER", "value": 13}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
    Bool(bool),
    Date(NaiveDate),
    Datetime(DateTime<Utc>),
    User(Uuid),
    #[serde(rename = "OPTION")]
    SingleOption(Uuid),
    /// Selected option ids in selection order
    MultiOption(Vec<Uuid>),
}

impl FieldValue {
    /// The data type this variant belongs to
    pub fn data_type(&self) -> DataType {
        match self {
            FieldValue::Text(_) => DataType::Text,
            FieldValue::Number(_) => DataType::Number,
            FieldValue::Bool(_) => DataType::Bool,
            FieldValue::Date(_) => DataType::Date,
            FieldValue::Datetime(_) => DataType::Datetime,
            FieldValue::User(_) => DataType::User,
            FieldValue::SingleOption(_) => DataType::SingleOption,
            FieldValue::MultiOption(_) => DataType::MultiOption,
        }
    }

    /// Option ids referenced by this value (empty for scalar types)
    pub fn option_ids(&self) -> Vec<Uuid> {
        match self {
            FieldValue::SingleOption(id) => vec![*id],
            FieldValue::MultiOption(ids) => ids.clone(),
            _ => Vec::new(),
        }
    }

    /// True for an empty MULTI_OPTION selection
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::MultiOption(ids) if ids.is_empty())
    }
}

/// Structured single-option payload: {"optionId": "<uuid>"}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionRef {
    pub option_id: Uuid,
}

/// Structured user payload used in change history: {"userId": "<uuid>"}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: Uuid,
}

/// A persisted field value row, already decoded into its tagged form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFieldValue {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub field_definition_id: Uuid,
    /// `None` when the row exists but every slot is null
    pub value: Option<FieldValue>,
    pub updated_at: DateTime<Utc>,
}
