//! Effective field: a context's metadata merged with an issue's stored value.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{FieldValue, OptionSummary};
use crate::shared::DataType;

/// Display-ready view of one field on one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveField {
    /// Field definition id
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub data_type: DataType,
    pub required: bool,
    pub visible: bool,
    pub editable: bool,
    pub order: i32,
    /// Sorted option catalog for option types, `None` otherwise
    pub options: Option<Vec<OptionSummary>>,
    /// Current value; MULTI_OPTION is always `Some`, possibly an empty list
    pub value: Option<FieldValue>,
    pub default_value: Option<String>,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    pub regex: Option<String>,
}
