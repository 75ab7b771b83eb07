//! Keyrelay Core - credential pools, usage tracking and request orchestration.
//!
//! This crate contains the domain logic of keyrelay.
//! It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod constants;
pub mod credentials;
pub mod errors;
pub mod gateway;
pub mod recovery;
pub mod usage;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
