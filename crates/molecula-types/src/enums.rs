//! Enumeration types for the Molecula service.
//!
//! Every enum here has a stable wire form that doubles as its
//! `PostgreSQL` column value, exposed through `as_str` and parsed back
//! with [`core::str::FromStr`]. Lifecycle and query enums are snake case;
//! interaction severity keeps its capitalized clinical labels.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error returned when a stored or submitted string does not name a
/// known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The offending input.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Query type
// ---------------------------------------------------------------------------

/// The kind of user-initiated operation recorded by a query log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum QueryType {
    /// A structure drawn in the molecule editor.
    StructureDrawing,
    /// A SMILES string submitted for ingest.
    SmilesUpload,
    /// A MOL block submitted for ingest.
    MolUpload,
    /// A search against the drug database.
    DatabaseSearch,
    /// A property prediction request.
    PropertyPrediction,
}

impl QueryType {
    /// All query types, in display order.
    pub const ALL: [Self; 5] = [
        Self::StructureDrawing,
        Self::SmilesUpload,
        Self::MolUpload,
        Self::DatabaseSearch,
        Self::PropertyPrediction,
    ];

    /// Stable wire and storage form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StructureDrawing => "structure_drawing",
            Self::SmilesUpload => "smiles_upload",
            Self::MolUpload => "mol_upload",
            Self::DatabaseSearch => "database_search",
            Self::PropertyPrediction => "property_prediction",
        }
    }

    /// Human-readable label used by the dashboard.
    pub const fn label(self) -> &'static str {
        match self {
            Self::StructureDrawing => "Structure Drawing",
            Self::SmilesUpload => "SMILES Upload",
            Self::MolUpload => "MOL Upload",
            Self::DatabaseSearch => "Database Search",
            Self::PropertyPrediction => "Property Prediction",
        }
    }
}

impl core::fmt::Display for QueryType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for QueryType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "query type",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Query status (lifecycle state machine)
// ---------------------------------------------------------------------------

/// Lifecycle state of a query log.
///
/// ```text
/// pending --> processing --+--> completed
///                          |
///                          +--> failed
/// ```
///
/// `completed` and `failed` are terminal: no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum QueryStatus {
    /// Allocated but not yet started.
    Pending,
    /// The domain action is running.
    Processing,
    /// The domain action succeeded.
    Completed,
    /// The domain action failed; the log carries the error detail.
    Failed,
}

impl QueryStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Failed,
    ];

    /// Stable wire and storage form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether this state admits no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed | Self::Failed)
        )
    }
}

impl core::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for QueryStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "query status",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Drug database search type
// ---------------------------------------------------------------------------

/// Which field a drug database search matches against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SearchType {
    /// Match compound names.
    Name,
    /// Match SMILES strings.
    Smiles,
    /// Match molecular formulas.
    Formula,
    /// Match any field.
    #[default]
    All,
}

impl SearchType {
    /// All search types.
    pub const ALL: [Self; 4] = [Self::Name, Self::Smiles, Self::Formula, Self::All];

    /// Stable wire form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Smiles => "smiles",
            Self::Formula => "formula",
            Self::All => "all",
        }
    }
}

impl core::str::FromStr for SearchType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "search type",
                value: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Drug interaction severity
// ---------------------------------------------------------------------------

/// Clinical severity of a predicted drug interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum InteractionSeverity {
    /// Minor interaction.
    Low,
    /// Interaction that may need monitoring.
    Moderate,
    /// Interaction that should be avoided.
    High,
}

impl InteractionSeverity {
    /// Stable storage form (matches the serde form).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }
}

impl core::str::FromStr for InteractionSeverity {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Self::Low),
            "Moderate" => Ok(Self::Moderate),
            "High" => Ok(Self::High),
            other => Err(UnknownVariant {
                kind: "interaction severity",
                value: other.to_owned(),
            }),
        }
    }
}
