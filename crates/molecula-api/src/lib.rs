//! HTTP API for the Molecula service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Molecule resources** (`/molecules`) with create, read, update, and
//!   delete, plus the tracked `process_smiles` and `process_mol_file`
//!   ingest operations
//! - **Read-only resources** for predictions (`/predictions`) and query
//!   logs (`/queries`, scoped to the caller unless privileged)
//! - **Drug database search** (`/drug-database/search`) and the
//!   staff-only **admin dashboard** (`/admin-dashboard/stats`)
//!
//! # Architecture
//!
//! Handlers receive an explicit [`AppState`] holding the entity store and
//! the structure processor. Callers authenticate with a bearer token via
//! the [`Caller`] extractor. Every failure becomes an [`ApiError`] with a
//! JSON body.
//!
//! [`Caller`]: auth::Caller
//! [`ApiError`]: error::ApiError

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
