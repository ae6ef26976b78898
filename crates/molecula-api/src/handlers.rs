//! REST API endpoint handlers.
//!
//! Every handler except [`health`] requires an authenticated [`Caller`].
//! Tracked operations (structure ingest, drug search) go through the
//! [`OperationRunner`](molecula_core::operations::OperationRunner), which
//! records a query log for each request that passes validation.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe (no auth) |
//! | `GET` | `/molecules` | List molecules |
//! | `POST` | `/molecules` | Create a molecule |
//! | `GET` | `/molecules/{id}` | Molecule with owner and predictions |
//! | `PUT` | `/molecules/{id}` | Replace a molecule's fields |
//! | `DELETE` | `/molecules/{id}` | Delete a molecule (cascades) |
//! | `POST` | `/molecules/process_smiles` | Tracked SMILES ingest |
//! | `POST` | `/molecules/process_mol_file` | Tracked MOL-file ingest |
//! | `GET` | `/predictions` | List predictions |
//! | `GET` | `/predictions/{id}` | Single prediction |
//! | `GET` | `/queries` | Query logs visible to the caller |
//! | `GET` | `/queries/{id}` | Single query log |
//! | `POST` | `/drug-database/search` | Tracked drug search |
//! | `GET` | `/admin-dashboard/stats` | Dashboard statistics (staff only) |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{FromRequest, Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use molecula_core::dashboard::dashboard_stats;
use molecula_core::operations::{
    Completed, DrugSearchInput, MolFileInput, Operation, Outcome, SmilesInput,
};
use molecula_types::{
    Molecule, MoleculeDetail, MoleculeId, PredictionId, QueryLog, QueryLogDetail, QueryLogId,
    User, UserId,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

/// Response header carrying the ID of the query log a request produced.
pub const QUERY_ID_HEADER: &str = "x-query-id";

/// JSON body extractor whose rejections use the API error format.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body for `POST /molecules` and `PUT /molecules/{id}`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MoleculeInput {
    /// Display name.
    #[validate(length(max = 255))]
    #[serde(default)]
    pub name: Option<String>,
    /// SMILES notation.
    #[serde(default)]
    pub smiles: String,
    /// MOL block.
    #[serde(default)]
    pub mol_file: Option<String>,
    /// Molecular formula.
    #[validate(length(max = 100))]
    #[serde(default)]
    pub formula: Option<String>,
    /// Molecular weight in g/mol.
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub molecular_weight: Option<f64>,
}

impl MoleculeInput {
    /// Validate, including the rule that some structure must be present.
    fn checked(self) -> Result<Self, ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);
        let has_mol = self
            .mol_file
            .as_deref()
            .is_some_and(|block| !block.trim().is_empty());
        if self.smiles.trim().is_empty() && !has_mol {
            let mut err = ValidationError::new("required");
            err.message = Some("Provide a SMILES string or a MOL block.".into());
            errors.add("smiles", err);
        }
        if errors.errors().is_empty() {
            Ok(self)
        } else {
            Err(errors)
        }
    }

    /// Copy the mutable fields onto a molecule.
    fn apply(self, molecule: &mut Molecule) {
        molecule.name = self
            .name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty());
        molecule.smiles = self.smiles.trim().to_owned();
        molecule.mol_file = self.mol_file.filter(|block| !block.trim().is_empty());
        molecule.formula = self.formula;
        molecule.molecular_weight = self.molecular_weight;
    }
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe. Reports the active store backend.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "store": state.store.backend(),
    }))
}

// ---------------------------------------------------------------------------
// Molecules
// ---------------------------------------------------------------------------

/// List all molecules. Items are flat: the owner appears as an ID.
pub async fn list_molecules(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_molecules().await?))
}

/// Create a molecule owned by the caller.
pub async fn create_molecule(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(input): ApiJson<MoleculeInput>,
) -> Result<impl IntoResponse, ApiError> {
    let input = input.checked()?;
    let mut molecule = Molecule::from_smiles(user.id, "");
    input.apply(&mut molecule);
    state.store.insert_molecule(&molecule).await?;

    tracing::info!(molecule_id = %molecule.id, user_id = %user.id, "Created molecule");
    let detail = molecule_detail(&state, molecule).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Return a molecule with its owner and predictions.
pub async fn get_molecule(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = MoleculeId::from(parse_uuid(&id)?);
    let molecule = state
        .store
        .get_molecule(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("molecule {id}")))?;

    Ok(Json(molecule_detail(&state, molecule).await?))
}

/// Replace a molecule's mutable fields.
pub async fn update_molecule(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<MoleculeInput>,
) -> Result<impl IntoResponse, ApiError> {
    let id = MoleculeId::from(parse_uuid(&id)?);
    let input = input.checked()?;
    let mut molecule = state
        .store
        .get_molecule(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("molecule {id}")))?;

    input.apply(&mut molecule);
    state.store.update_molecule(&molecule).await?;

    tracing::info!(molecule_id = %id, user_id = %user.id, "Updated molecule");
    Ok(Json(molecule_detail(&state, molecule).await?))
}

/// Delete a molecule, its predictions, and log references to it.
pub async fn delete_molecule(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = MoleculeId::from(parse_uuid(&id)?);
    state.store.delete_molecule(id).await?;

    tracing::info!(molecule_id = %id, user_id = %user.id, "Deleted molecule");
    Ok(StatusCode::NO_CONTENT)
}

/// Tracked SMILES ingest. Responds 201 with the stored molecule.
pub async fn process_smiles(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(input): ApiJson<SmilesInput>,
) -> Result<impl IntoResponse, ApiError> {
    let operation = Operation::smiles_upload(input)?;
    let completed = state.runner().run(&user, operation).await?;
    created_molecule(user, completed)
}

/// Tracked MOL-file ingest. Responds 201 with the stored molecule.
pub async fn process_mol_file(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(input): ApiJson<MolFileInput>,
) -> Result<impl IntoResponse, ApiError> {
    let operation = Operation::mol_upload(input)?;
    let completed = state.runner().run(&user, operation).await?;
    created_molecule(user, completed)
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

/// List all prediction trees.
pub async fn list_predictions(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_predictions().await?))
}

/// Return one prediction tree.
pub async fn get_prediction(
    State(state): State<Arc<AppState>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = PredictionId::from(parse_uuid(&id)?);
    let prediction = state
        .store
        .get_prediction(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("prediction {id}")))?;

    Ok(Json(prediction))
}

// ---------------------------------------------------------------------------
// Query logs
// ---------------------------------------------------------------------------

/// List the query logs the caller may see: their own, or all for staff.
pub async fn list_queries(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    let logs = state.store.list_query_logs(caller.log_scope()).await?;

    let mut users: BTreeMap<UserId, Option<User>> = BTreeMap::new();
    let mut details = Vec::with_capacity(logs.len());
    for log in logs {
        let user_detail = match users.get(&log.user) {
            Some(cached) => cached.clone(),
            None => {
                let fetched = state.store.get_user(log.user).await?;
                users.insert(log.user, fetched.clone());
                fetched
            }
        };
        details.push(query_log_detail(&state, log, user_detail).await?);
    }

    Ok(Json(details))
}

/// Return one query log. Another user's log is reported as not found to
/// non-privileged callers.
pub async fn get_query(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = QueryLogId::from(parse_uuid(&id)?);
    let log = state
        .store
        .get_query_log(id)
        .await?
        .filter(|log| caller.log_scope().is_none_or(|owner| log.user == owner))
        .ok_or_else(|| ApiError::NotFound(format!("query log {id}")))?;

    let user_detail = state.store.get_user(log.user).await?;
    Ok(Json(query_log_detail(&state, log, user_detail).await?))
}

// ---------------------------------------------------------------------------
// Drug database
// ---------------------------------------------------------------------------

/// Tracked drug database search.
pub async fn drug_search(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(input): ApiJson<DrugSearchInput>,
) -> Result<impl IntoResponse, ApiError> {
    let operation = Operation::database_search(input)?;
    let Completed { query_id, outcome } = state.runner().run(&user, operation).await?;

    let Outcome::SearchResults(results) = outcome else {
        return Err(ApiError::Internal(format!(
            "query {query_id}: search produced a molecule"
        )));
    };

    Ok((
        [(QUERY_ID_HEADER, query_id_header(query_id)?)],
        Json(serde_json::json!({ "results": results })),
    ))
}

// ---------------------------------------------------------------------------
// Admin dashboard
// ---------------------------------------------------------------------------

/// Dashboard statistics. Staff only.
pub async fn admin_stats(caller: Caller) -> Result<impl IntoResponse, ApiError> {
    caller.require_staff()?;
    Ok(Json(dashboard_stats()))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a UUID path segment.
fn parse_uuid(s: &str) -> Result<Uuid, ApiError> {
    s.parse::<Uuid>()
        .map_err(|e| ApiError::NotFound(format!("{s}: {e}")))
}

fn query_id_header(id: QueryLogId) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&id.to_string()).map_err(|e| ApiError::Internal(e.to_string()))
}

async fn molecule_detail(state: &AppState, molecule: Molecule) -> Result<MoleculeDetail, ApiError> {
    let user = state.store.get_user(molecule.created_by).await?;
    let predictions = state.store.list_predictions_for_molecule(molecule.id).await?;
    Ok(MoleculeDetail {
        molecule,
        user,
        predictions,
    })
}

async fn query_log_detail(
    state: &AppState,
    log: QueryLog,
    user_detail: Option<User>,
) -> Result<QueryLogDetail, ApiError> {
    let molecule_detail = match log.molecule {
        Some(id) => state.store.get_molecule(id).await?,
        None => None,
    };
    Ok(QueryLogDetail {
        log,
        user_detail,
        molecule_detail,
    })
}

fn created_molecule(user: User, completed: Completed) -> Result<impl IntoResponse, ApiError> {
    let Completed { query_id, outcome } = completed;
    let Outcome::Molecule(molecule) = outcome else {
        return Err(ApiError::Internal(format!(
            "query {query_id}: ingest produced no molecule"
        )));
    };

    let detail = MoleculeDetail {
        molecule,
        user: Some(user),
        predictions: Vec::new(),
    };
    Ok((
        StatusCode::CREATED,
        [(QUERY_ID_HEADER, query_id_header(query_id)?)],
        Json(detail),
    ))
}
