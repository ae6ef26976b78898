//! Structure processor: the seam to an external chemistry toolkit.
//!
//! The service does not parse chemistry. [`StructureProcessor`] stands in
//! for a toolkit and is dispatched by `match`; adding a real backend means
//! adding a variant.

use molecula_db::DbError;

use crate::config::{ProcessingConfig, ToolkitMode};

/// Failure of a domain action. The message is recorded on the query log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DomainError(pub String);

impl DomainError {
    /// Create a domain error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<DbError> for DomainError {
    fn from(err: DbError) -> Self {
        Self(format!("could not store result: {err}"))
    }
}

/// Derived properties a toolkit may report for a structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedStructure {
    /// Molecular formula.
    pub formula: Option<String>,
    /// Molecular weight in g/mol.
    pub molecular_weight: Option<f64>,
}

/// Stand-in for the external chemistry toolkit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StructureProcessor {
    /// Accept every structure unchanged; derive nothing.
    #[default]
    Passthrough,
    /// The toolkit is unavailable; every call fails with `reason`.
    Offline {
        /// Failure detail.
        reason: String,
    },
}

impl StructureProcessor {
    /// Build the processor selected by configuration.
    pub fn from_config(config: &ProcessingConfig) -> Self {
        match config.toolkit {
            ToolkitMode::Passthrough => Self::Passthrough,
            ToolkitMode::Offline => Self::Offline {
                reason: config.offline_reason.clone(),
            },
        }
    }

    /// Process a SMILES string.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] when the toolkit is offline.
    pub fn process_smiles(&self, smiles: &str) -> Result<ProcessedStructure, DomainError> {
        self.process("SMILES", smiles)
    }

    /// Process a MOL block.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] when the toolkit is offline.
    pub fn process_mol_block(&self, block: &str) -> Result<ProcessedStructure, DomainError> {
        self.process("MOL block", block)
    }

    fn process(&self, notation: &str, input: &str) -> Result<ProcessedStructure, DomainError> {
        match self {
            Self::Passthrough => {
                tracing::trace!(notation, len = input.len(), "Passthrough structure");
                Ok(ProcessedStructure::default())
            }
            Self::Offline { reason } => Err(DomainError::new(format!(
                "could not process {notation}: {reason}"
            ))),
        }
    }
}
