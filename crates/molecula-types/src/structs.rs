//! Core record structs for the Molecula service.
//!
//! Covers users, molecules, the prediction tree (prediction plus toxicity,
//! target organ, and drug interaction sub-records), and query logs. The
//! query log carries its own lifecycle state machine; see
//! [`QueryLog::begin`], [`QueryLog::complete`], and [`QueryLog::fail`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{InteractionSeverity, QueryStatus, QueryType};
use crate::ids::{
    DrugInteractionId, MoleculeId, PredictionId, QueryLogId, TargetOrganId, ToxicityPredictionId,
    UserId,
};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// An identified caller of the API.
///
/// Staff users are privileged: they can read every query log and the
/// admin dashboard. The API token is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Login name, unique per deployment.
    pub username: String,
    /// Contact address (may be empty).
    #[serde(default)]
    pub email: String,
    /// Given name (may be empty).
    #[serde(default)]
    pub first_name: String,
    /// Family name (may be empty).
    #[serde(default)]
    pub last_name: String,
    /// Whether this user is privileged.
    #[serde(default)]
    pub is_staff: bool,
    /// Bearer token presented in the `Authorization` header.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub api_token: String,
}

impl User {
    /// Create a non-privileged user with empty contact details.
    pub fn new(username: &str, api_token: &str) -> Self {
        Self {
            id: UserId::new(),
            username: username.to_owned(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_staff: false,
            api_token: api_token.to_owned(),
        }
    }

    /// Mark the user as privileged.
    #[must_use]
    pub const fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Molecule
// ---------------------------------------------------------------------------

/// A chemical entity identified by a SMILES string and/or a MOL block.
///
/// Invariant: at least one of `smiles` and `mol_file` is non-blank. See
/// [`Molecule::has_structure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Molecule {
    /// Unique molecule identifier.
    pub id: MoleculeId,
    /// Optional display name.
    pub name: Option<String>,
    /// SMILES line notation. Empty when the molecule came from a MOL block.
    pub smiles: String,
    /// MOL block, when the molecule was ingested from a file.
    pub mol_file: Option<String>,
    /// Molecular formula (e.g. `C2H6O`).
    pub formula: Option<String>,
    /// Molecular weight in g/mol.
    pub molecular_weight: Option<f64>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// The user who created the record.
    pub created_by: UserId,
}

impl Molecule {
    /// Create a molecule from a SMILES string.
    pub fn from_smiles(created_by: UserId, smiles: &str) -> Self {
        Self {
            id: MoleculeId::new(),
            name: None,
            smiles: smiles.to_owned(),
            mol_file: None,
            formula: None,
            molecular_weight: None,
            created_at: Utc::now(),
            created_by,
        }
    }

    /// Create a molecule from a MOL block. The SMILES field stays empty.
    pub fn from_mol_file(created_by: UserId, mol_file: &str) -> Self {
        Self {
            mol_file: Some(mol_file.to_owned()),
            ..Self::from_smiles(created_by, "")
        }
    }

    /// Set the display name. Blank names are stored as `None`.
    #[must_use]
    pub fn with_name(mut self, name: Option<&str>) -> Self {
        self.name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_owned);
        self
    }

    /// Whether at least one structural notation is populated.
    pub fn has_structure(&self) -> bool {
        !self.smiles.trim().is_empty()
            || self
                .mol_file
                .as_deref()
                .is_some_and(|block| !block.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Prediction tree
// ---------------------------------------------------------------------------

/// Computed property estimates for a molecule, with nested sub-records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Prediction {
    /// Unique prediction identifier.
    pub id: PredictionId,
    /// The molecule this prediction belongs to.
    pub molecule: MoleculeId,
    /// Aqueous solubility score.
    pub solubility: Option<f64>,
    /// Octanol-water partition coefficient.
    pub logp: Option<f64>,
    /// Drug-likeness score.
    pub drug_likeness: Option<f64>,
    /// Oral bioavailability score.
    pub bioavailability: Option<f64>,
    /// Estimated half-life, free text (e.g. `"4-6 hours"`).
    pub half_life: Option<String>,
    /// When the prediction was created.
    pub created_at: DateTime<Utc>,
    /// One-to-one toxicity estimates.
    pub toxicity: Option<ToxicityPrediction>,
    /// Ordered list of likely target organs.
    pub target_organs: Vec<TargetOrgan>,
    /// Ordered list of predicted drug interactions.
    pub drug_interactions: Vec<DrugInteraction>,
}

impl Prediction {
    /// Create an empty prediction for a molecule.
    pub fn new(molecule: MoleculeId) -> Self {
        Self {
            id: PredictionId::new(),
            molecule,
            solubility: None,
            logp: None,
            drug_likeness: None,
            bioavailability: None,
            half_life: None,
            created_at: Utc::now(),
            toxicity: None,
            target_organs: Vec::new(),
            drug_interactions: Vec::new(),
        }
    }

    /// Return the first target organ whose probability lies outside `[0, 1]`.
    pub fn invalid_target_organ(&self) -> Option<&TargetOrgan> {
        self.target_organs
            .iter()
            .find(|organ| !organ.has_valid_probability())
    }
}

/// Organ-level toxicity estimates for a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ToxicityPrediction {
    /// Unique sub-record identifier.
    pub id: ToxicityPredictionId,
    /// Liver toxicity.
    pub hepatotoxicity: Option<f64>,
    /// Heart toxicity.
    pub cardiotoxicity: Option<f64>,
    /// Kidney toxicity.
    pub nephrotoxicity: Option<f64>,
    /// Nervous system toxicity.
    pub neurotoxicity: Option<f64>,
}

impl ToxicityPrediction {
    /// Create a toxicity record with no estimates.
    pub fn new() -> Self {
        Self {
            id: ToxicityPredictionId::new(),
            hepatotoxicity: None,
            cardiotoxicity: None,
            nephrotoxicity: None,
            neurotoxicity: None,
        }
    }
}

impl Default for ToxicityPrediction {
    fn default() -> Self {
        Self::new()
    }
}

/// An organ the molecule is predicted to act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TargetOrgan {
    /// Unique sub-record identifier.
    pub id: TargetOrganId,
    /// Organ name.
    pub organ: String,
    /// Probability in `[0, 1]`.
    pub probability: f64,
}

impl TargetOrgan {
    /// Create a target organ entry.
    pub fn new(organ: &str, probability: f64) -> Self {
        Self {
            id: TargetOrganId::new(),
            organ: organ.to_owned(),
            probability,
        }
    }

    /// Whether the probability lies in `[0, 1]` (NaN is invalid).
    pub fn has_valid_probability(&self) -> bool {
        (0.0..=1.0).contains(&self.probability)
    }
}

/// A predicted interaction with another drug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DrugInteraction {
    /// Unique sub-record identifier.
    pub id: DrugInteractionId,
    /// Name of the interacting drug.
    pub drug: String,
    /// Clinical severity.
    pub severity: InteractionSeverity,
    /// Free-text description of the interaction.
    pub description: String,
}

impl DrugInteraction {
    /// Create a drug interaction entry.
    pub fn new(drug: &str, severity: InteractionSeverity, description: &str) -> Self {
        Self {
            id: DrugInteractionId::new(),
            drug: drug.to_owned(),
            severity,
            description: description.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Query log
// ---------------------------------------------------------------------------

/// A transition that the query log lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid query log transition: {from} -> {to}")]
pub struct InvalidTransition {
    /// State the log was in.
    pub from: QueryStatus,
    /// State that was requested.
    pub to: QueryStatus,
}

/// Audit record tracking one user-initiated operation from submission
/// to terminal outcome.
///
/// A log is mutated only through its transition methods, each of which
/// either applies every field change or none of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QueryLog {
    /// Unique log identifier.
    pub id: QueryLogId,
    /// The user who submitted the operation.
    pub user: UserId,
    /// The molecule produced by the operation (set only on success).
    pub molecule: Option<MoleculeId>,
    /// Kind of operation.
    pub query_type: QueryType,
    /// Serialized input payload kept for audit and replay.
    pub query_data: Option<String>,
    /// Current lifecycle state.
    pub status: QueryStatus,
    /// Failure detail (set only when `status` is `failed`).
    pub error_message: Option<String>,
    /// When the operation was submitted.
    pub created_at: DateTime<Utc>,
    /// When the operation reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl QueryLog {
    /// Allocate a new log in the `pending` state.
    pub fn new(user: UserId, query_type: QueryType, query_data: Option<String>) -> Self {
        Self {
            id: QueryLogId::new(),
            user,
            molecule: None,
            query_type,
            query_data,
            status: QueryStatus::Pending,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// `pending -> processing`.
    pub fn begin(&mut self) -> Result<(), InvalidTransition> {
        self.check(QueryStatus::Processing)?;
        self.status = QueryStatus::Processing;
        Ok(())
    }

    /// `processing -> completed`, linking the produced molecule if any.
    pub fn complete(&mut self, molecule: Option<MoleculeId>) -> Result<(), InvalidTransition> {
        self.check(QueryStatus::Completed)?;
        self.completed_at = Some(self.completion_time());
        self.molecule = molecule;
        self.status = QueryStatus::Completed;
        Ok(())
    }

    /// `processing -> failed`, recording the error detail.
    pub fn fail(&mut self, error_message: &str) -> Result<(), InvalidTransition> {
        self.check(QueryStatus::Failed)?;
        self.completed_at = Some(self.completion_time());
        self.error_message = Some(error_message.to_owned());
        self.status = QueryStatus::Failed;
        Ok(())
    }

    const fn check(&self, to: QueryStatus) -> Result<(), InvalidTransition> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self.status,
                to,
            })
        }
    }

    /// Wall-clock now, never earlier than `created_at`.
    fn completion_time(&self) -> DateTime<Utc> {
        Utc::now().max(self.created_at)
    }
}

// ---------------------------------------------------------------------------
// Drug database
// ---------------------------------------------------------------------------

/// One compound returned by a drug database search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DrugSearchResult {
    /// `PubChem` compound ID.
    pub id: u32,
    /// Common name.
    pub name: String,
    /// Molecular formula.
    pub formula: String,
    /// Molecular weight in g/mol.
    pub molecular_weight: f64,
    /// Canonical SMILES.
    pub smiles: String,
    /// Therapeutic category.
    pub category: String,
    /// Structure image URL.
    pub image: String,
}

// ---------------------------------------------------------------------------
// Admin dashboard
// ---------------------------------------------------------------------------

/// Aggregate statistics shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct DashboardStats {
    /// Headline counters.
    pub stats: HeadlineStats,
    /// Monthly user activity series.
    pub user_activity: ChartSeries,
    /// Query volume per query type.
    pub query_types: ChartSeries,
    /// Accuracy per prediction model.
    pub model_performance: ChartSeries,
}

/// Headline counters on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct HeadlineStats {
    /// Registered users.
    pub total_users: u64,
    /// Users active in the last month.
    pub active_users: u64,
    /// Queries submitted overall.
    pub total_queries: u64,
    /// Mean response time in seconds.
    pub average_response_time: f64,
}

/// A labelled chart with one or more datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChartSeries {
    /// X-axis labels.
    pub labels: Vec<String>,
    /// Data series sharing the labels.
    pub datasets: Vec<ChartDataset>,
}

/// One data series of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChartDataset {
    /// Series name.
    pub label: String,
    /// One value per label.
    pub data: Vec<f64>,
}
