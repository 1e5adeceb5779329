//! Ports module - re-exports service and storage port definitions

pub use crate::domain::service_port::{
    FieldService, IssueDirectory, PriorityDirectory, UserDirectory,
};
pub use crate::domain::storage_port::FieldStorage;

#[cfg(feature = "mock")]
pub use crate::domain::service_port::MockFieldService;
