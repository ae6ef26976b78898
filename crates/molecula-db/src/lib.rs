//! Data layer for the Molecula service.
//!
//! Holds users, molecules, prediction trees, and query logs behind one
//! [`Store`] handle with two interchangeable backends.
//!
//! # Architecture
//!
//! ```text
//! Store (enum dispatch)
//!     |
//!     +-- Memory ----> MemoryStore (tables behind one RwLock)
//!     |
//!     +-- Postgres --> PostgresPool
//!         |-- UserStore        (users, token lookup)
//!         |-- MoleculeStore    (molecules; cascades via foreign keys)
//!         |-- PredictionStore  (prediction tree, one transaction per insert)
//!         +-- QueryLogStore    (append-only audit trail, conditional finish)
//! ```
//!
//! # Modules
//!
//! - [`store`] -- The backend-agnostic [`Store`] handle
//! - [`memory`] -- In-process backend
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`users`], [`molecules`], [`predictions`], [`query_logs`] -- `PostgreSQL` table operations
//! - [`error`] -- Shared error types

pub mod error;
pub mod memory;
pub mod molecules;
pub mod postgres;
pub mod predictions;
pub mod query_logs;
pub mod store;
pub mod users;

// Re-export primary types for convenience.
pub use error::DbError;
pub use memory::MemoryStore;
pub use molecules::{MoleculeRow, MoleculeStore};
pub use postgres::{PostgresConfig, PostgresPool};
pub use predictions::{
    DrugInteractionRow, PredictionRow, PredictionStore, TargetOrganRow, ToxicityRow,
};
pub use query_logs::{QueryLogRow, QueryLogStore};
pub use store::Store;
pub use users::{UserRow, UserStore};
