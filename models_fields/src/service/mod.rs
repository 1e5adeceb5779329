//! Service layer types - the in-memory contract of the field engine.

pub mod change_log;
pub mod effective_field;
pub mod field_context;
pub mod field_definition;
pub mod field_option;
pub mod field_value;
pub mod issue;

pub use change_log::{ChangeItem, ChangeLogEntry, DisplayEntry, DisplayItem};
pub use effective_field::EffectiveField;
pub use field_context::{ContextWithDefinition, FieldConstraints, FieldContext};
pub use field_definition::FieldDefinition;
pub use field_option::{FieldOption, OptionSummary, UNKNOWN_OPTION_LABEL};
pub use field_value::{FieldValue, OptionRef, StoredFieldValue, UserRef};
pub use issue::IssueCore;
