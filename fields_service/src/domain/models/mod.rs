//! Domain models - core business entities
//!
//! This module re-exports models_fields types as the single source of truth,
//! and adds domain behavior (validation, constructors, coercion, precedence) via free functions.

// Per-data-type dispatch table (coercion and history payloads)
pub mod codec;
// Domain extensions (constructors and validation for models_fields types)
pub mod extensions;
// Context precedence and default fallback
pub mod precedence;

// Request/response models (domain-specific, not in models_fields)
pub mod requests;
pub mod responses;

// Re-export models_fields types as domain models (single source of truth)
pub use models_fields::service::{
    ChangeItem, ChangeLogEntry, ContextWithDefinition, DisplayEntry, DisplayItem, EffectiveField,
    FieldConstraints, FieldContext, FieldDefinition, FieldOption, FieldValue, IssueCore,
    OptionRef, OptionSummary, StoredFieldValue, UNKNOWN_OPTION_LABEL, UserRef,
};
pub use models_fields::shared::{ContextScope, DataType};

pub use requests::*;
pub use responses::*;
