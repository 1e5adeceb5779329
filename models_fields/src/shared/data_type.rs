//! Data type shared across database and service layers.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Data type of a custom field, determining storage slot, coercion and history decoding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "field_data_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    /// Free text.
    Text,
    /// Exact decimal number.
    Number,
    /// true/false.
    Bool,
    /// Calendar date without time (`YYYY-MM-DD`).
    Date,
    /// Timestamp in UTC.
    Datetime,
    /// Reference to a user id.
    User,
    /// Exactly one option from the field's catalog.
    #[serde(rename = "OPTION")]
    #[strum(serialize = "OPTION")]
    #[sqlx(rename = "OPTION")]
    SingleOption,
    /// Any number of options from the field's catalog.
    MultiOption,
}

impl DataType {
    /// Every data type, in declaration order.
    pub const ALL: [DataType; 8] = [
        DataType::Text,
        DataType::Number,
        DataType::Bool,
        DataType::Date,
        DataType::Datetime,
        DataType::User,
        DataType::SingleOption,
        DataType::MultiOption,
    ];

    /// Whether this type draws its values from an option catalog
    pub fn is_option_type(&self) -> bool {
        matches!(self, DataType::SingleOption | DataType::MultiOption)
    }

    /// Whether min/max bounds may be configured on a context
    pub fn supports_bounds(&self) -> bool {
        matches!(self, DataType::Number)
    }

    /// Whether a regex may be configured on a context
    pub fn supports_regex(&self) -> bool {
        matches!(self, DataType::Text)
    }

    /// Whether a scalar default value may be configured on a context
    pub fn supports_default_value(&self) -> bool {
        matches!(self, DataType::Text | DataType::Number)
    }
}
