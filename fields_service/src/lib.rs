//! Custom field engine following the hexagonal architecture pattern
//!
//! This library provides field definition, context, value resolution and upsert
//! domain logic and can be composed into various runtime contexts (services, workers, etc.)

#[cfg(feature = "postgres")]
pub mod config;
pub mod domain;
pub mod outbound;
