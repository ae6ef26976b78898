//! Integration tests for the Molecula API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, on a fresh in-memory store per test.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use molecula_api::handlers::QUERY_ID_HEADER;
use molecula_api::router::build_router;
use molecula_api::state::AppState;
use molecula_core::processing::StructureProcessor;
use molecula_db::Store;
use molecula_types::{
    InteractionSeverity, Molecule, Prediction, QueryLogId, QueryStatus, QueryType, TargetOrgan,
    ToxicityPrediction, DrugInteraction, User,
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";
const ADMIN: &str = "admin-token";

async fn make_test_state(processor: StructureProcessor) -> Arc<AppState> {
    let store = Store::memory();
    store.insert_user(&User::new("alice", ALICE)).await.unwrap();
    store.insert_user(&User::new("bob", BOB)).await.unwrap();
    store
        .insert_user(&User::new("admin", ADMIN).staff())
        .await
        .unwrap();
    Arc::new(AppState::new(store, processor))
}

async fn passthrough_state() -> Arc<AppState> {
    make_test_state(StructureProcessor::Passthrough).await
}

async fn send(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    build_router(Arc::clone(state))
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn query_id(response: &Response) -> QueryLogId {
    let raw = response
        .headers()
        .get(QUERY_ID_HEADER)
        .unwrap()
        .to_str()
        .unwrap();
    QueryLogId::from(raw.parse::<Uuid>().unwrap())
}

async fn user_id(state: &Arc<AppState>, token: &str) -> molecula_types::UserId {
    state.store.find_user_by_token(token).await.unwrap().unwrap().id
}

// =========================================================================
// Health and authentication
// =========================================================================

#[tokio::test]
async fn test_health_needs_no_auth() {
    let state = Arc::new(AppState::in_memory());
    let response = send(&state, "GET", "/health", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store"], "memory");
}

#[tokio::test]
async fn test_missing_or_unknown_token_is_401() {
    let state = passthrough_state().await;

    let response = send(&state, "GET", "/molecules", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&state, "GET", "/molecules", Some("nobody"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 401);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_unauthenticated_ingest_creates_no_log() {
    let state = passthrough_state().await;
    let response = send(
        &state,
        "POST",
        "/molecules/process_smiles",
        None,
        Some(json!({ "smiles": "CCO" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(state.store.count_query_logs().await.unwrap(), 0);
}

// =========================================================================
// Tracked operations
// =========================================================================

#[tokio::test]
async fn test_process_smiles_creates_molecule_and_completed_log() {
    let state = passthrough_state().await;
    let response = send(
        &state,
        "POST",
        "/molecules/process_smiles",
        Some(ALICE),
        Some(json!({ "smiles": "CCO", "name": "Ethanol" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let log_id = query_id(&response);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["smiles"], "CCO");
    assert_eq!(json["name"], "Ethanol");
    assert_eq!(json["user"]["username"], "alice");
    assert!(json["user"].get("api_token").is_none());
    assert_eq!(json["predictions"], json!([]));

    let log = state.store.get_query_log(log_id).await.unwrap().unwrap();
    assert_eq!(log.status, QueryStatus::Completed);
    assert_eq!(log.query_type, QueryType::SmilesUpload);
    assert_eq!(
        log.molecule.map(|m| m.to_string()),
        json["id"].as_str().map(str::to_owned)
    );
    assert!(log.completed_at.is_some_and(|at| at >= log.created_at));
    assert_eq!(state.store.count_query_logs().await.unwrap(), 1);
}

#[tokio::test]
async fn test_process_smiles_validation_failure_creates_no_log() {
    let state = passthrough_state().await;

    let response = send(
        &state,
        "POST",
        "/molecules/process_smiles",
        Some(ALICE),
        Some(json!({ "smiles": "   " })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["fields"]["smiles"][0], "This field may not be blank.");

    let response = send(
        &state,
        "POST",
        "/molecules/process_smiles",
        Some(ALICE),
        Some(json!({ "name": "no structure" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["fields"]["smiles"][0], "This field is required.");

    assert_eq!(state.store.count_query_logs().await.unwrap(), 0);
    assert!(state.store.list_molecules().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_required_fields_are_reported_per_field() {
    let state = passthrough_state().await;

    let cases = [
        ("/molecules/process_mol_file", json!({ "name": "Methane" }), "mol_file"),
        ("/drug-database/search", json!({ "search_type": "name" }), "query"),
    ];
    for (uri, body, field) in cases {
        let response = send(&state, "POST", uri, Some(ALICE), Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["fields"][field][0], "This field is required.", "{uri}");
    }

    assert_eq!(state.store.count_query_logs().await.unwrap(), 0);
}

#[tokio::test]
async fn test_domain_failure_records_failed_log() {
    let state = make_test_state(StructureProcessor::Offline {
        reason: "RDKit not installed".to_owned(),
    })
    .await;

    let response = send(
        &state,
        "POST",
        "/molecules/process_smiles",
        Some(ALICE),
        Some(json!({ "smiles": "CCO" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("SMILES Upload"));
    // The detail stays in the log, not the response.
    assert!(!message.contains("RDKit"));

    let logs = state.store.list_query_logs(None).await.unwrap();
    assert_eq!(logs.len(), 1);
    let log = &logs[0];
    assert!(message.contains(&log.id.to_string()));
    assert_eq!(log.status, QueryStatus::Failed);
    assert!(log
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("RDKit not installed")));
    assert!(log.molecule.is_none());
    assert!(state.store.list_molecules().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_process_mol_file_logs_only_the_name() {
    let state = passthrough_state().await;
    let block = "\n  Molecula\n\n  1  0  0  0  0  0            999 V2000\nM  END\n";
    let response = send(
        &state,
        "POST",
        "/molecules/process_mol_file",
        Some(ALICE),
        Some(json!({ "mol_file": block, "name": "Methane" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let log_id = query_id(&response);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["smiles"], "");
    assert_eq!(json["mol_file"], block);

    let log = state.store.get_query_log(log_id).await.unwrap().unwrap();
    assert_eq!(log.query_type, QueryType::MolUpload);
    let payload: Value = serde_json::from_str(log.query_data.as_deref().unwrap()).unwrap();
    assert_eq!(payload, json!({ "name": "Methane" }));
}

#[tokio::test]
async fn test_drug_search_returns_fixed_results() {
    let state = passthrough_state().await;
    let response = send(
        &state,
        "POST",
        "/drug-database/search",
        Some(ALICE),
        Some(json!({ "query": "aspirin", "search_type": "name" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let log_id = query_id(&response);
    let json = body_to_json(response.into_body()).await;
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["name"], "Aspirin");
    assert_eq!(results[0]["id"], 2244);
    assert_eq!(results[1]["name"], "Ibuprofen");
    assert_eq!(results[1]["id"], 3672);

    let log = state.store.get_query_log(log_id).await.unwrap().unwrap();
    assert_eq!(log.query_type, QueryType::DatabaseSearch);
    assert_eq!(log.status, QueryStatus::Completed);
    assert!(log.molecule.is_none());
}

#[tokio::test]
async fn test_drug_search_rejects_unknown_search_type() {
    let state = passthrough_state().await;
    let response = send(
        &state,
        "POST",
        "/drug-database/search",
        Some(ALICE),
        Some(json!({ "query": "aspirin", "search_type": "everything" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.store.count_query_logs().await.unwrap(), 0);
}

// =========================================================================
// Query log visibility
// =========================================================================

#[tokio::test]
async fn test_query_logs_are_scoped_to_their_owner() {
    let state = passthrough_state().await;

    let alice_resp = send(
        &state,
        "POST",
        "/molecules/process_smiles",
        Some(ALICE),
        Some(json!({ "smiles": "CCO" })),
    )
    .await;
    let alice_log = query_id(&alice_resp);
    let bob_resp = send(
        &state,
        "POST",
        "/drug-database/search",
        Some(BOB),
        Some(json!({ "query": "ibuprofen" })),
    )
    .await;
    let bob_log = query_id(&bob_resp);

    let response = send(&state, "GET", "/queries", Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let logs = json.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["id"], alice_log.to_string());
    assert_eq!(logs[0]["user_detail"]["username"], "alice");
    assert_eq!(logs[0]["molecule_detail"]["smiles"], "CCO");
    assert_eq!(logs[0]["user"], logs[0]["user_detail"]["id"]);
    assert_eq!(logs[0]["molecule"], logs[0]["molecule_detail"]["id"]);
    assert!(logs[0]["user"].is_string());

    let response = send(&state, "GET", &format!("/queries/{bob_log}"), Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&state, "GET", &format!("/queries/{bob_log}"), Some(BOB), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&state, "GET", "/queries", Some(ADMIN), None).await;
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let response = send(&state, "GET", &format!("/queries/{alice_log}"), Some(ADMIN), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["query_type"], "smiles_upload");
}

// =========================================================================
// Admin dashboard
// =========================================================================

#[tokio::test]
async fn test_admin_stats_requires_staff() {
    let state = passthrough_state().await;

    let response = send(&state, "GET", "/admin-dashboard/stats", Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&state, "GET", "/admin-dashboard/stats", Some(ADMIN), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["stats"]["totalUsers"], 1248);
    assert_eq!(json["stats"]["activeUsers"], 876);
    assert_eq!(json["queryTypes"]["labels"][0], "Structure Drawing");
}

// =========================================================================
// Molecule resources
// =========================================================================

#[tokio::test]
async fn test_molecule_crud_round() {
    let state = passthrough_state().await;

    let response = send(
        &state,
        "POST",
        "/molecules",
        Some(ALICE),
        Some(json!({ "smiles": "c1ccccc1", "name": "Benzene", "molecular_weight": 78.11 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_to_json(response.into_body()).await;
    let id = created["id"].as_str().unwrap().to_owned();
    assert_eq!(created["user"]["username"], "alice");

    let response = send(&state, "GET", "/molecules", Some(BOB), None).await;
    let list = body_to_json(response.into_body()).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert!(list[0]["created_by"].is_string());
    assert!(list[0].get("predictions").is_none());

    let response = send(
        &state,
        "PUT",
        &format!("/molecules/{id}"),
        Some(ALICE),
        Some(json!({ "smiles": "c1ccccc1", "name": "Benzol", "formula": "C6H6" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_to_json(response.into_body()).await;
    assert_eq!(updated["name"], "Benzol");
    assert_eq!(updated["formula"], "C6H6");
    assert_eq!(updated["created_at"], created["created_at"]);

    let response = send(
        &state,
        "PUT",
        &format!("/molecules/{id}"),
        Some(ALICE),
        Some(json!({ "smiles": "", "name": "Nothing" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&state, "DELETE", &format!("/molecules/{id}"), Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&state, "GET", &format!("/molecules/{id}"), Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_molecule_rejects_negative_weight() {
    let state = passthrough_state().await;
    let response = send(
        &state,
        "POST",
        "/molecules",
        Some(ALICE),
        Some(json!({ "smiles": "C", "molecular_weight": -1.0 })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["fields"]["molecular_weight"].is_array());
}

#[tokio::test]
async fn test_create_molecule_without_structure_names_the_field() {
    let state = passthrough_state().await;
    let response = send(
        &state,
        "POST",
        "/molecules",
        Some(ALICE),
        Some(json!({ "name": "Nothing", "smiles": "  ", "molecular_weight": -2.0 })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
    assert_eq!(
        json["fields"]["smiles"],
        json!(["Provide a SMILES string or a MOL block."])
    );
    assert!(json["fields"]["molecular_weight"].is_array());
    assert!(state.store.list_molecules().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_or_malformed_ids_are_404() {
    let state = passthrough_state().await;

    let response = send(
        &state,
        "GET",
        &format!("/molecules/{}", Uuid::now_v7()),
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&state, "GET", "/predictions/not-a-uuid", Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_molecule_detail_nests_predictions_and_delete_cascades() {
    let state = passthrough_state().await;
    let owner = user_id(&state, ALICE).await;

    let molecule = Molecule::from_smiles(owner, "CC(=O)OC1=CC=CC=C1C(=O)O").with_name(Some("Aspirin"));
    state.store.insert_molecule(&molecule).await.unwrap();

    let mut prediction = Prediction::new(molecule.id);
    prediction.logp = Some(1.19);
    prediction.half_life = Some("15-20 minutes".to_owned());
    prediction.toxicity = Some(ToxicityPrediction::new());
    prediction.target_organs.push(TargetOrgan::new("Stomach", 0.8));
    prediction.drug_interactions.push(DrugInteraction::new(
        "Warfarin",
        InteractionSeverity::High,
        "Increased bleeding risk",
    ));
    state.store.insert_prediction(&prediction).await.unwrap();

    let response = send(&state, "GET", &format!("/molecules/{}", molecule.id), Some(BOB), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["name"], "Aspirin");
    assert_eq!(json["predictions"][0]["half_life"], "15-20 minutes");
    assert_eq!(json["predictions"][0]["target_organs"][0]["organ"], "Stomach");
    assert_eq!(json["predictions"][0]["drug_interactions"][0]["severity"], "High");

    let response = send(&state, "GET", "/predictions", Some(BOB), None).await;
    let list = body_to_json(response.into_body()).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let response = send(
        &state,
        "GET",
        &format!("/predictions/{}", prediction.id),
        Some(BOB),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["toxicity"].is_object());

    let response = send(
        &state,
        "DELETE",
        &format!("/molecules/{}", molecule.id),
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(state.store.get_prediction(prediction.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_deleting_ingested_molecule_keeps_its_log() {
    let state = passthrough_state().await;
    let response = send(
        &state,
        "POST",
        "/molecules/process_smiles",
        Some(ALICE),
        Some(json!({ "smiles": "CCO" })),
    )
    .await;
    let log_id = query_id(&response);
    let json = body_to_json(response.into_body()).await;
    let molecule_id = json["id"].as_str().unwrap().to_owned();

    let response = send(
        &state,
        "DELETE",
        &format!("/molecules/{molecule_id}"),
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&state, "GET", &format!("/queries/{log_id}"), Some(ALICE), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "completed");
    assert!(json["molecule"].is_null());
    assert!(json["molecule_detail"].is_null());
}
