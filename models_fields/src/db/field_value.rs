//! Database layer field value model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::error::DbConversionError;
use crate::service::{FieldValue, OptionRef, StoredFieldValue};
use crate::shared::DataType;

/// Row of `field_values`: one nullable slot per primitive type plus an opaque JSON slot.
///
/// MULTI_OPTION rows keep every slot null; the selection lives in `field_value_options`.
#[derive(Debug, Clone)]
pub struct FieldValueRow {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub field_definition_id: Uuid,
    pub text_value: Option<String>,
    pub number_value: Option<Decimal>,
    pub bool_value: Option<bool>,
    pub date_value: Option<NaiveDate>,
    pub datetime_value: Option<DateTime<Utc>>,
    pub user_value: Option<Uuid>,
    pub json_value: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

/// Row of `field_value_options`.
#[derive(Debug, Clone)]
pub struct FieldValueOptionRow {
    pub field_value_id: Uuid,
    pub option_id: Uuid,
    pub position: i32,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for FieldValueRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        Ok(FieldValueRow {
            id: row.try_get("id")?,
            issue_id: row.try_get("issue_id")?,
            field_definition_id: row.try_get("field_definition_id")?,
            text_value: row.try_get("text_value")?,
            number_value: row.try_get("number_value")?,
            bool_value: row.try_get("bool_value")?,
            date_value: row.try_get("date_value")?,
            datetime_value: row.try_get("datetime_value")?,
            user_value: row.try_get("user_value")?,
            json_value: row.try_get("json_value")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for FieldValueOptionRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        Ok(FieldValueOptionRow {
            field_value_id: row.try_get("field_value_id")?,
            option_id: row.try_get("option_id")?,
            position: row.try_get("position")?,
        })
    }
}

/// The slot columns written for one value. Exactly zero or one slot is populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValueSlots {
    pub text_value: Option<String>,
    pub number_value: Option<Decimal>,
    pub bool_value: Option<bool>,
    pub date_value: Option<NaiveDate>,
    pub datetime_value: Option<DateTime<Utc>>,
    pub user_value: Option<Uuid>,
    pub json_value: Option<serde_json::Value>,
}

impl FieldValueSlots {
    /// Spread a tagged value over the slot columns
    pub fn from_value(value: Option<&FieldValue>) -> Result<Self, DbConversionError> {
        let mut slots = FieldValueSlots::default();
        match value {
            None | Some(FieldValue::MultiOption(_)) => {}
            Some(FieldValue::Text(s)) => slots.text_value = Some(s.clone()),
            Some(FieldValue::Number(n)) => slots.number_value = Some(*n),
            Some(FieldValue::Bool(b)) => slots.bool_value = Some(*b),
            Some(FieldValue::Date(d)) => slots.date_value = Some(*d),
            Some(FieldValue::Datetime(d)) => slots.datetime_value = Some(*d),
            Some(FieldValue::User(u)) => slots.user_value = Some(*u),
            Some(FieldValue::SingleOption(option_id)) => {
                let payload = serde_json::to_value(OptionRef {
                    option_id: *option_id,
                })
                .map_err(|e| DbConversionError::PayloadEncoding(e.to_string()))?;
                slots.json_value = Some(payload);
            }
        }
        Ok(slots)
    }

    fn populated(&self) -> usize {
        [
            self.text_value.is_some(),
            self.number_value.is_some(),
            self.bool_value.is_some(),
            self.date_value.is_some(),
            self.datetime_value.is_some(),
            self.user_value.is_some(),
            self.json_value.is_some(),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }
}

impl FieldValueRow {
    fn slots(&self) -> FieldValueSlots {
        FieldValueSlots {
            text_value: self.text_value.clone(),
            number_value: self.number_value,
            bool_value: self.bool_value,
            date_value: self.date_value,
            datetime_value: self.datetime_value,
            user_value: self.user_value,
            json_value: self.json_value.clone(),
        }
    }

    /// Read the slot matching `data_type` into the tagged form.
    ///
    /// `option_ids` are the associated `field_value_options` rows in position order and
    /// are only consulted for MULTI_OPTION.
    pub fn into_stored(
        self,
        data_type: DataType,
        option_ids: Vec<Uuid>,
    ) -> Result<StoredFieldValue, DbConversionError> {
        let mismatch = DbConversionError::SlotMismatch {
            id: self.id,
            data_type,
        };
        let slots = self.slots();

        let value = match data_type {
            DataType::MultiOption => {
                if slots.populated() > 0 {
                    return Err(mismatch);
                }
                Some(FieldValue::MultiOption(option_ids))
            }
            _ if slots.populated() > 1 => return Err(mismatch),
            DataType::Text => {
                only_slot(slots.text_value.is_some(), &slots, mismatch)?;
                slots.text_value.map(FieldValue::Text)
            }
            DataType::Number => {
                only_slot(slots.number_value.is_some(), &slots, mismatch)?;
                slots.number_value.map(FieldValue::Number)
            }
            DataType::Bool => {
                only_slot(slots.bool_value.is_some(), &slots, mismatch)?;
                slots.bool_value.map(FieldValue::Bool)
            }
            DataType::Date => {
                only_slot(slots.date_value.is_some(), &slots, mismatch)?;
                slots.date_value.map(FieldValue::Date)
            }
            DataType::Datetime => {
                only_slot(slots.datetime_value.is_some(), &slots, mismatch)?;
                slots.datetime_value.map(FieldValue::Datetime)
            }
            DataType::User => {
                only_slot(slots.user_value.is_some(), &slots, mismatch)?;
                slots.user_value.map(FieldValue::User)
            }
            DataType::SingleOption => {
                only_slot(slots.json_value.is_some(), &slots, mismatch)?;
                match slots.json_value {
                    Some(payload) => {
                        let option_ref: OptionRef = serde_json::from_value(payload).map_err(
                            |e| DbConversionError::InvalidOptionPayload {
                                id: self.id,
                                reason: e.to_string(),
                            },
                        )?;
                        Some(FieldValue::SingleOption(option_ref.option_id))
                    }
                    None => None,
                }
            }
        };

        Ok(StoredFieldValue {
            id: self.id,
            issue_id: self.issue_id,
            field_definition_id: self.field_definition_id,
            value,
            updated_at: self.updated_at,
        })
    }
}

/// Errors unless the populated slot (if any) is the expected one
fn only_slot(
    expected_is_set: bool,
    slots: &FieldValueSlots,
    mismatch: DbConversionError,
) -> Result<(), DbConversionError> {
    if slots.populated() == 1 && !expected_is_set {
        return Err(mismatch);
    }
    Ok(())
}
