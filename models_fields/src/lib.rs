//! Custom Field Models
//!
//! This crate defines the data models for the custom field engine using a three-layer architecture:
//!
//! - **shared**: Shared types (DataType, ContextScope) used across all layers
//! - **db**: Database layer types (row shapes with one nullable slot per primitive type)
//! - **service**: Business logic layer types (tagged values, effective fields, change log)

pub mod db;
pub mod service;
pub mod shared;

// Re-export commonly used shared types for convenience
pub use shared::{ContextScope, DataType};
