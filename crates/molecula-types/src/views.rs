//! Expanded read views returned by the HTTP API.
//!
//! Records reference each other by ID; these views inline the referenced
//! records so a single detail request returns everything a client renders.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::structs::{Molecule, Prediction, QueryLog, User};

/// A molecule with its creator and every prediction made for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MoleculeDetail {
    /// The molecule record.
    #[serde(flatten)]
    pub molecule: Molecule,
    /// The creating user, if still present.
    pub user: Option<User>,
    /// Predictions for this molecule, oldest first.
    pub predictions: Vec<Prediction>,
}

/// A query log with its submitter and produced molecule inlined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QueryLogDetail {
    /// The log record.
    #[serde(flatten)]
    pub log: QueryLog,
    /// The submitting user.
    pub user_detail: Option<User>,
    /// The produced molecule, if the operation created one that still exists.
    pub molecule_detail: Option<Molecule>,
}
