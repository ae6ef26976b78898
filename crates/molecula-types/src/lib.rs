//! Shared type definitions for the Molecula service.
//!
//! This crate is the single source of truth for the records stored and
//! served by Molecula. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the web client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all record identifiers
//! - [`enums`] -- Query types, query lifecycle states, search and severity enums
//! - [`structs`] -- Users, molecules, the prediction tree, query logs, dashboard data
//! - [`views`] -- Expanded detail views for the HTTP API

pub mod enums;
pub mod ids;
pub mod structs;
pub mod views;

// Re-export all public types at crate root for convenience.
pub use enums::{InteractionSeverity, QueryStatus, QueryType, SearchType, UnknownVariant};
pub use ids::{
    DrugInteractionId, MoleculeId, PredictionId, QueryLogId, TargetOrganId, ToxicityPredictionId,
    UserId,
};
pub use structs::{
    ChartDataset, ChartSeries, DashboardStats, DrugInteraction, DrugSearchResult, HeadlineStats,
    InvalidTransition, Molecule, Prediction, QueryLog, TargetOrgan, ToxicityPrediction, User,
};
pub use views::{MoleculeDetail, QueryLogDetail};
