//! Query tracking and operation handling for the Molecula service.
//!
//! This crate owns the lifecycle of user-submitted operations: input
//! validation, the tracked run of each domain action, and the query log
//! transitions that record it.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `molecula-config.yaml` into
//!   strongly-typed structs.
//! - [`tracker`] -- [`QueryTracker`], the query log state machine driver.
//! - [`operations`] -- Validated [`Operation`]s and the [`OperationRunner`].
//! - [`processing`] -- [`StructureProcessor`], the chemistry toolkit seam.
//! - [`search`] -- Drug database search.
//! - [`dashboard`] -- Admin dashboard statistics.
//!
//! [`QueryTracker`]: tracker::QueryTracker
//! [`Operation`]: operations::Operation
//! [`OperationRunner`]: operations::OperationRunner
//! [`StructureProcessor`]: processing::StructureProcessor

pub mod config;
pub mod dashboard;
pub mod operations;
pub mod processing;
pub mod search;
pub mod tracker;
