//! Database layer conversion errors

use thiserror::Error;
use uuid::Uuid;

use crate::shared::DataType;

/// Errors that can occur during database model conversions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DbConversionError {
    #[error(
        "Invalid database state: field_value {id} has a populated slot that does not belong to data type {data_type}"
    )]
    SlotMismatch { id: Uuid, data_type: DataType },

    #[error("Invalid database state: field_value {id} has an unreadable option payload: {reason}")]
    InvalidOptionPayload { id: Uuid, reason: String },

    #[error("Failed to encode option payload: {0}")]
    PayloadEncoding(String),
}
