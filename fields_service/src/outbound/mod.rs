//! Outbound adapters - implementations of domain ports

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{FieldMemoryStorage, MemoryStorageError};
#[cfg(feature = "postgres")]
pub use postgres::{FieldsPgStorage, FieldsStorageError};
