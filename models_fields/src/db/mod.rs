//! Database layer types - used only by storage adapters.
//!
//! These structs directly map to database tables and include all database fields.
//! Field values keep one nullable column per primitive type; the conversions here
//! are the only place that knows which column belongs to which [crate::DataType].

pub mod change_log;
pub mod error;
pub mod field_context;
pub mod field_definition;
pub mod field_option;
pub mod field_value;

pub use change_log::{ChangeItemRow, ChangeLogRow};
pub use error::DbConversionError;
pub use field_context::FieldContextRow;
pub use field_definition::FieldDefinitionRow;
pub use field_option::FieldOptionRow;
pub use field_value::{FieldValueOptionRow, FieldValueRow, FieldValueSlots};
