//! SQLite storage implementation for keyrelay.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `keyrelay-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - The credential repository and the usage log
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! `core` is database-agnostic and works with traits.
//!
//! ```text
//!   core (domain)            worker (host)
//!        │                        │
//!        └───────────┬────────────┘
//!                    │
//!                    ▼
//!         storage-sqlite (this crate)
//!                    │
//!                    ▼
//!                SQLite DB
//! ```
//!
//! Reads go through the r2d2 pool. Every write is a job on the single
//! writer actor, which runs it inside an immediate transaction.

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod credentials;
pub mod usage;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use credentials::CredentialRepository;
pub use usage::UsageLogRepository;

// Re-export from keyrelay-core for convenience
pub use keyrelay_core::errors::{DatabaseError, Error, Result};
