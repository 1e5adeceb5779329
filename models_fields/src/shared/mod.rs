//! Shared types used across database and service layers.

pub mod context_scope;
pub mod data_type;

pub use context_scope::ContextScope;
pub use data_type::DataType;
