//! Response models for field engine operations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of an upsert batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertFieldsResponse {
    /// Number of values written
    pub written: usize,
    /// Field definition ids that were skipped because no such definition exists
    pub skipped: Vec<Uuid>,
    /// Id of the recorded change log entry, absent when nothing changed
    pub change_log_id: Option<Uuid>,
}
