//! Tracked operations.
//!
//! Every user-submitted operation follows the same protocol:
//!
//! ```text
//! input --validate--> Operation --tracker.open--> processing
//!                                     |
//!                              run domain action
//!                               /             \
//!                      Ok(Outcome)        Err(DomainError)
//!                tracker.succeed          tracker.fail
//!                      |                        |
//!                 Completed          OperationError::Domain
//! ```
//!
//! Validation failures never create a query log.

use std::collections::BTreeMap;

use molecula_db::{DbError, Store};
use molecula_types::{
    DrugSearchResult, Molecule, MoleculeId, QueryLogId, QueryType, SearchType, User,
};
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::processing::{DomainError, StructureProcessor};
use crate::search::search_drugs;
use crate::tracker::{QueryTracker, TrackerError};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Body of a SMILES ingest request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SmilesInput {
    /// SMILES string; required and non-blank.
    #[validate(required(message = "This field is required."))]
    #[serde(default)]
    pub smiles: Option<String>,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of a MOL-file ingest request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MolFileInput {
    /// MOL block; required and non-blank.
    #[validate(required(message = "This field is required."))]
    #[serde(default)]
    pub mol_file: Option<String>,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of a drug database search request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DrugSearchInput {
    /// Search text; required and non-blank.
    #[validate(required(message = "This field is required."))]
    #[serde(default)]
    pub query: Option<String>,
    /// Field to match against.
    #[serde(default)]
    pub search_type: SearchType,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("This field may not be blank.".into());
        return Err(err);
    }
    Ok(())
}

/// Merge the derived checks with the blank check on one required text
/// field, yielding the text when both pass.
fn required_text(
    derived: Result<(), ValidationErrors>,
    field: &'static str,
    value: Option<String>,
) -> Result<String, ValidationErrors> {
    let mut errors = derived.err().unwrap_or_else(ValidationErrors::new);
    if let Some(Err(err)) = value.as_deref().map(not_blank) {
        errors.add(field, err);
    }
    match value {
        Some(text) if errors.errors().is_empty() => Ok(text),
        _ => Err(errors),
    }
}

/// Flatten validator output into `{field: [messages]}`.
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map_or_else(|| e.code.to_string(), ToString::to_string)
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

fn clean_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty())
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A validated operation, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Store a molecule from a SMILES string.
    SmilesUpload {
        /// Trimmed SMILES.
        smiles: String,
        /// Display name, if any.
        name: Option<String>,
    },
    /// Store a molecule from a MOL block.
    MolUpload {
        /// MOL block as submitted.
        mol_file: String,
        /// Display name, if any.
        name: Option<String>,
    },
    /// Search the drug database.
    DatabaseSearch {
        /// Trimmed search text.
        query: String,
        /// Field to match against.
        search_type: SearchType,
    },
}

impl Operation {
    /// Validate a SMILES ingest body.
    ///
    /// # Errors
    ///
    /// Returns the field errors when validation fails.
    pub fn smiles_upload(input: SmilesInput) -> Result<Self, ValidationErrors> {
        let smiles = required_text(input.validate(), "smiles", input.smiles)?;
        Ok(Self::SmilesUpload {
            smiles: smiles.trim().to_owned(),
            name: clean_name(input.name),
        })
    }

    /// Validate a MOL-file ingest body.
    ///
    /// # Errors
    ///
    /// Returns the field errors when validation fails.
    pub fn mol_upload(input: MolFileInput) -> Result<Self, ValidationErrors> {
        let mol_file = required_text(input.validate(), "mol_file", input.mol_file)?;
        Ok(Self::MolUpload {
            mol_file,
            name: clean_name(input.name),
        })
    }

    /// Validate a drug search body.
    ///
    /// # Errors
    ///
    /// Returns the field errors when validation fails.
    pub fn database_search(input: DrugSearchInput) -> Result<Self, ValidationErrors> {
        let query = required_text(input.validate(), "query", input.query)?;
        Ok(Self::DatabaseSearch {
            query: query.trim().to_owned(),
            search_type: input.search_type,
        })
    }

    /// Query type recorded on the log.
    pub const fn query_type(&self) -> QueryType {
        match self {
            Self::SmilesUpload { .. } => QueryType::SmilesUpload,
            Self::MolUpload { .. } => QueryType::MolUpload,
            Self::DatabaseSearch { .. } => QueryType::DatabaseSearch,
        }
    }

    /// JSON payload recorded on the log. The MOL block itself is not
    /// copied into the audit trail.
    pub fn audit_payload(&self) -> String {
        let value = match self {
            Self::SmilesUpload { smiles, name } => {
                serde_json::json!({ "smiles": smiles, "name": name })
            }
            Self::MolUpload { name, .. } => serde_json::json!({ "name": name }),
            Self::DatabaseSearch { query, search_type } => {
                serde_json::json!({ "query": query, "search_type": search_type.as_str() })
            }
        };
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Outcomes and errors
// ---------------------------------------------------------------------------

/// What a successful operation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A newly stored molecule.
    Molecule(Molecule),
    /// Drug database hits.
    SearchResults(Vec<DrugSearchResult>),
}

impl Outcome {
    /// The molecule to link from the query log, if any.
    pub const fn molecule_id(&self) -> Option<MoleculeId> {
        match self {
            Self::Molecule(m) => Some(m.id),
            Self::SearchResults(_) => None,
        }
    }
}

/// A successful operation and the log that recorded it.
#[derive(Debug, Clone, PartialEq)]
pub struct Completed {
    /// The completed query log.
    pub query_id: QueryLogId,
    /// The produced result.
    pub outcome: Outcome,
}

/// Errors returned by [`OperationRunner::run`].
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// The input was rejected before anything was recorded.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The domain action failed; the log is `failed` with `detail`.
    #[error("{kind} failed (query {query_id})")]
    Domain {
        /// The failed query log.
        query_id: QueryLogId,
        /// Operation kind.
        kind: QueryType,
        /// Recorded failure detail.
        detail: String,
    },

    /// The tracker could not record a transition.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// The store failed outside the domain action.
    #[error(transparent)]
    Store(#[from] DbError),
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Runs operations against a store and a structure processor.
pub struct OperationRunner<'a> {
    store: &'a Store,
    processor: &'a StructureProcessor,
}

impl<'a> OperationRunner<'a> {
    /// Create a runner.
    pub const fn new(store: &'a Store, processor: &'a StructureProcessor) -> Self {
        Self { store, processor }
    }

    /// Run one operation on behalf of `caller`, tracking it end to end.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Domain`] when the domain action fails (the
    /// log is closed as `failed`), or [`OperationError::Tracker`] when a
    /// transition cannot be recorded.
    pub async fn run(&self, caller: &User, operation: Operation) -> Result<Completed, OperationError> {
        let kind = operation.query_type();
        let tracker = QueryTracker::new(self.store);
        let mut log = tracker
            .open(caller.id, kind, Some(operation.audit_payload()))
            .await?;

        tracing::info!(
            query_id = %log.id,
            query_type = %kind,
            user_id = %caller.id,
            "Operation started"
        );

        match self.execute(caller, operation).await {
            Ok(outcome) => {
                tracker.succeed(&mut log, outcome.molecule_id()).await?;
                Ok(Completed {
                    query_id: log.id,
                    outcome,
                })
            }
            Err(DomainError(detail)) => {
                tracing::warn!(
                    query_id = %log.id,
                    query_type = %kind,
                    user_id = %caller.id,
                    error = %detail,
                    "Operation failed"
                );
                tracker.fail(&mut log, &detail).await?;
                Err(OperationError::Domain {
                    query_id: log.id,
                    kind,
                    detail,
                })
            }
        }
    }

    async fn execute(&self, caller: &User, operation: Operation) -> Result<Outcome, DomainError> {
        match operation {
            Operation::SmilesUpload { smiles, name } => {
                let processed = self.processor.process_smiles(&smiles)?;
                let mut molecule = Molecule::from_smiles(caller.id, &smiles).with_name(name.as_deref());
                molecule.formula = processed.formula;
                molecule.molecular_weight = processed.molecular_weight;
                self.store.insert_molecule(&molecule).await?;
                Ok(Outcome::Molecule(molecule))
            }
            Operation::MolUpload { mol_file, name } => {
                let processed = self.processor.process_mol_block(&mol_file)?;
                let mut molecule =
                    Molecule::from_mol_file(caller.id, &mol_file).with_name(name.as_deref());
                molecule.formula = processed.formula;
                molecule.molecular_weight = processed.molecular_weight;
                self.store.insert_molecule(&molecule).await?;
                Ok(Outcome::Molecule(molecule))
            }
            Operation::DatabaseSearch { query, search_type } => {
                Ok(Outcome::SearchResults(search_drugs(&query, search_type)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use molecula_types::QueryStatus;

    use super::*;

    async fn setup() -> (Store, User) {
        let store = Store::memory();
        let user = User::new("alice", "alice-token");
        store.insert_user(&user).await.unwrap();
        (store, user)
    }

    fn smiles(smiles: &str, name: Option<&str>) -> SmilesInput {
        SmilesInput {
            smiles: Some(smiles.to_owned()),
            name: name.map(str::to_owned),
        }
    }

    #[test]
    fn blank_smiles_is_a_field_error() {
        let err = Operation::smiles_upload(smiles("   ", None)).unwrap_err();
        let fields = field_messages(&err);
        assert_eq!(
            fields.get("smiles"),
            Some(&vec!["This field may not be blank.".to_owned()])
        );
    }

    #[test]
    fn missing_required_fields_are_field_errors() {
        let err = Operation::smiles_upload(SmilesInput {
            smiles: None,
            name: Some("Ethanol".to_owned()),
        })
        .unwrap_err();
        assert_eq!(
            field_messages(&err).get("smiles"),
            Some(&vec!["This field is required.".to_owned()])
        );

        let err = Operation::mol_upload(MolFileInput {
            mol_file: None,
            name: None,
        })
        .unwrap_err();
        assert!(field_messages(&err).contains_key("mol_file"));

        let err = Operation::database_search(DrugSearchInput {
            query: None,
            search_type: SearchType::All,
        })
        .unwrap_err();
        assert_eq!(
            field_messages(&err).get("query"),
            Some(&vec!["This field is required.".to_owned()])
        );
    }

    #[test]
    fn inputs_are_trimmed_and_blank_names_dropped() {
        let op = Operation::smiles_upload(smiles("  CCO ", Some(" "))).unwrap();
        assert_eq!(
            op,
            Operation::SmilesUpload {
                smiles: "CCO".to_owned(),
                name: None,
            }
        );
    }

    #[test]
    fn mol_payload_omits_the_block() {
        let op = Operation::mol_upload(MolFileInput {
            mol_file: Some("\n  RDKit\n\nM  END".to_owned()),
            name: Some("Benzene".to_owned()),
        })
        .unwrap();
        assert_eq!(op.query_type(), QueryType::MolUpload);
        assert_eq!(op.audit_payload(), r#"{"name":"Benzene"}"#);
    }

    #[tokio::test]
    async fn smiles_upload_completes_and_links_molecule() {
        let (store, user) = setup().await;
        let processor = StructureProcessor::Passthrough;
        let runner = OperationRunner::new(&store, &processor);

        let op = Operation::smiles_upload(smiles("CCO", Some("Ethanol"))).unwrap();
        let done = runner.run(&user, op).await.unwrap();

        let Outcome::Molecule(molecule) = &done.outcome else {
            panic!("expected a molecule");
        };
        assert_eq!(molecule.smiles, "CCO");
        assert_eq!(molecule.name.as_deref(), Some("Ethanol"));
        assert_eq!(molecule.created_by, user.id);

        let log = store.get_query_log(done.query_id).await.unwrap().unwrap();
        assert_eq!(log.status, QueryStatus::Completed);
        assert_eq!(log.molecule, Some(molecule.id));
        assert!(log.completed_at.is_some_and(|at| at >= log.created_at));
        assert!(log.query_data.is_some_and(|d| d.contains("Ethanol")));
    }

    #[tokio::test]
    async fn offline_toolkit_fails_the_log_without_a_molecule() {
        let (store, user) = setup().await;
        let processor = StructureProcessor::Offline {
            reason: "RDKit not installed".to_owned(),
        };
        let runner = OperationRunner::new(&store, &processor);

        let op = Operation::smiles_upload(smiles("CCO", None)).unwrap();
        let err = runner.run(&user, op).await.unwrap_err();

        let OperationError::Domain { query_id, kind, .. } = err else {
            panic!("expected a domain failure, got {err:?}");
        };
        assert_eq!(kind, QueryType::SmilesUpload);
        let log = store.get_query_log(query_id).await.unwrap().unwrap();
        assert_eq!(log.status, QueryStatus::Failed);
        assert!(log.error_message.is_some_and(|m| m.contains("RDKit not installed")));
        assert!(log.molecule.is_none());
        assert!(store.list_molecules().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mol_upload_stores_block_with_empty_smiles() {
        let (store, user) = setup().await;
        let processor = StructureProcessor::Passthrough;
        let runner = OperationRunner::new(&store, &processor);

        let op = Operation::mol_upload(MolFileInput {
            mol_file: Some("\n  RDKit\n\nM  END".to_owned()),
            name: None,
        })
        .unwrap();
        let done = runner.run(&user, op).await.unwrap();

        let Outcome::Molecule(molecule) = done.outcome else {
            panic!("expected a molecule");
        };
        assert!(molecule.smiles.is_empty());
        assert!(molecule.mol_file.is_some());
    }

    #[tokio::test]
    async fn search_completes_without_a_molecule() {
        let (store, user) = setup().await;
        let processor = StructureProcessor::Passthrough;
        let runner = OperationRunner::new(&store, &processor);

        let op = Operation::database_search(DrugSearchInput {
            query: Some("aspirin".to_owned()),
            search_type: SearchType::Name,
        })
        .unwrap();
        let done = runner.run(&user, op).await.unwrap();

        assert!(matches!(&done.outcome, Outcome::SearchResults(r) if r.len() == 2));
        let log = store.get_query_log(done.query_id).await.unwrap().unwrap();
        assert_eq!(log.query_type, QueryType::DatabaseSearch);
        assert_eq!(log.status, QueryStatus::Completed);
        assert!(log.molecule.is_none());
    }
}
