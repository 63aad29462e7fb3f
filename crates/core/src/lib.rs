//! Pricewatch Core - Alert domain entities, services, and traits.
//!
//! This crate contains the alert business logic for pricewatch.
//! It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod alerts;
pub mod errors;
pub mod notifications;
pub mod quotes;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
