//! Per-data-type dispatch table.
//!
//! Upsert coercion, history payload encoding and history payload decoding all go
//! through [codec_for], so a data type is handled the same way at every call site.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use models_fields::service::{FieldValue, OptionRef, UserRef};
use models_fields::shared::DataType;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use uuid::Uuid;

/// A history payload decoded far enough to know which lookup it needs.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryRef {
    /// Display the string as-is
    Verbatim(String),
    /// An option id, with the payload it was read from for display when the option is gone
    Option { id: Uuid, raw: String },
    Options(Vec<Uuid>),
    User(Uuid),
    /// Payload could not be decoded; displayed as the raw string
    Undecodable(String),
}

/// Behavior of one data type.
pub trait FieldCodec: Send + Sync {
    /// Coerce a raw client value. `Ok(None)` clears the value; `Err` is a validation failure.
    fn normalize(&self, raw: &Value) -> Result<Option<FieldValue>, String>;

    /// Decode a before/after payload recorded in the change log
    fn decode_history(&self, payload: &str) -> HistoryRef;
}

struct TextCodec;
struct NumberCodec;
struct BoolCodec;
struct DateCodec;
struct DatetimeCodec;
struct UserCodec;
struct SingleOptionCodec;
struct MultiOptionCodec;

/// The codec for a data type
pub fn codec_for(data_type: DataType) -> &'static dyn FieldCodec {
    match data_type {
        DataType::Text => &TextCodec,
        DataType::Number => &NumberCodec,
        DataType::Bool => &BoolCodec,
        DataType::Date => &DateCodec,
        DataType::Datetime => &DatetimeCodec,
        DataType::User => &UserCodec,
        DataType::SingleOption => &SingleOptionCodec,
        DataType::MultiOption => &MultiOptionCodec,
    }
}

/// Encode a value into the payload recorded in the change log
pub fn history_payload(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Number(n) => n.normalize().to_string(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        FieldValue::Datetime(d) => d.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
        FieldValue::User(user_id) => json!({ "userId": user_id }).to_string(),
        FieldValue::SingleOption(option_id) => json!({ "optionId": option_id }).to_string(),
        FieldValue::MultiOption(ids) => Value::from(
            ids.iter()
                .map(|id| Value::String(id.to_string()))
                .collect::<Vec<_>>(),
        )
        .to_string(),
    }
}

/// Parse an exact decimal, accepting scientific notation
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
        .map(|d| d.normalize())
}

impl FieldCodec for TextCodec {
    fn normalize(&self, raw: &Value) -> Result<Option<FieldValue>, String> {
        Ok(match raw {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            other => Some(FieldValue::Text(other.to_string())),
        })
    }

    fn decode_history(&self, payload: &str) -> HistoryRef {
        HistoryRef::Verbatim(payload.to_string())
    }
}

impl FieldCodec for NumberCodec {
    fn normalize(&self, raw: &Value) -> Result<Option<FieldValue>, String> {
        match raw {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => parse_decimal(s)
                .map(|n| Some(FieldValue::Number(n)))
                .ok_or_else(|| format!("'{s}' is not a number")),
            Value::Number(n) => parse_decimal(&n.to_string())
                .map(|n| Some(FieldValue::Number(n)))
                .ok_or_else(|| format!("{n} cannot be represented as a decimal")),
            other => Err(format!("{other} is not a number")),
        }
    }

    fn decode_history(&self, payload: &str) -> HistoryRef {
        HistoryRef::Verbatim(payload.to_string())
    }
}

impl FieldCodec for BoolCodec {
    fn normalize(&self, raw: &Value) -> Result<Option<FieldValue>, String> {
        Ok(match raw {
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(FieldValue::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(FieldValue::Bool(false)),
            _ => None,
        })
    }

    fn decode_history(&self, payload: &str) -> HistoryRef {
        HistoryRef::Verbatim(payload.to_string())
    }
}

/// `YYYY-MM-DD` and nothing else
fn parse_strict_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

impl FieldCodec for DateCodec {
    fn normalize(&self, raw: &Value) -> Result<Option<FieldValue>, String> {
        Ok(raw
            .as_str()
            .and_then(parse_strict_date)
            .map(FieldValue::Date))
    }

    fn decode_history(&self, payload: &str) -> HistoryRef {
        HistoryRef::Verbatim(payload.to_string())
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let with_offset = DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%z"));
    if let Ok(dt) = with_offset {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    parse_strict_date(s)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl FieldCodec for DatetimeCodec {
    fn normalize(&self, raw: &Value) -> Result<Option<FieldValue>, String> {
        Ok(raw
            .as_str()
            .and_then(parse_timestamp)
            .map(FieldValue::Datetime))
    }

    fn decode_history(&self, payload: &str) -> HistoryRef {
        HistoryRef::Verbatim(payload.to_string())
    }
}

impl FieldCodec for UserCodec {
    fn normalize(&self, raw: &Value) -> Result<Option<FieldValue>, String> {
        Ok(raw
            .as_str()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(FieldValue::User))
    }

    fn decode_history(&self, payload: &str) -> HistoryRef {
        if let Ok(user_ref) = serde_json::from_str::<UserRef>(payload) {
            return HistoryRef::User(user_ref.user_id);
        }
        match Uuid::parse_str(payload.trim().trim_matches('"')) {
            Ok(id) => HistoryRef::User(id),
            Err(_) => HistoryRef::Undecodable(payload.to_string()),
        }
    }
}

fn parse_option_id(s: &str) -> Result<Uuid, String> {
    Uuid::parse_str(s.trim()).map_err(|_| format!("'{s}' is not a valid option id"))
}

impl FieldCodec for SingleOptionCodec {
    fn normalize(&self, raw: &Value) -> Result<Option<FieldValue>, String> {
        match raw {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => parse_option_id(s).map(|id| Some(FieldValue::SingleOption(id))),
            Value::Object(_) => serde_json::from_value::<OptionRef>(raw.clone())
                .map(|option_ref| Some(FieldValue::SingleOption(option_ref.option_id)))
                .map_err(|e| format!("invalid option reference: {e}")),
            other => Err(format!("{other} is not a valid option id")),
        }
    }

    fn decode_history(&self, payload: &str) -> HistoryRef {
        if let Ok(option_ref) = serde_json::from_str::<OptionRef>(payload) {
            return HistoryRef::Option {
                id: option_ref.option_id,
                raw: payload.to_string(),
            };
        }
        match Uuid::parse_str(payload.trim().trim_matches('"')) {
            Ok(id) => HistoryRef::Option {
                id,
                raw: payload.to_string(),
            },
            Err(_) => HistoryRef::Undecodable(payload.to_string()),
        }
    }
}

impl FieldCodec for MultiOptionCodec {
    fn normalize(&self, raw: &Value) -> Result<Option<FieldValue>, String> {
        let candidates: Vec<&str> = match raw {
            Value::Null => Vec::new(),
            Value::String(s) => vec![s.as_str()],
            // Only string entries count as ids
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            other => return Err(format!("{other} is not a list of option ids")),
        };

        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(candidates.len());
        for candidate in candidates.into_iter().filter(|s| !s.trim().is_empty()) {
            let id = parse_option_id(candidate)?;
            if seen.insert(id) {
                ids.push(id);
            }
        }
        Ok(Some(FieldValue::MultiOption(ids)))
    }

    fn decode_history(&self, payload: &str) -> HistoryRef {
        match serde_json::from_str::<Vec<Value>>(payload) {
            Ok(items) => HistoryRef::Options(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|s| Uuid::parse_str(s).ok())
                    .collect(),
            ),
            Err(_) => HistoryRef::Undecodable(payload.to_string()),
        }
    }
}
