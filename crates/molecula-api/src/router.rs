//! Axum router construction for the Molecula API.
//!
//! Assembles all routes into a single [`Router`] with CORS middleware
//! enabled for cross-origin web client access and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderName;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The static `process_*` routes sit beside `/molecules/{id}`; static
/// segments win over the parameter in Axum's matcher.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(handlers::QUERY_ID_HEADER)]);

    Router::new()
        .route("/health", get(handlers::health))
        // Molecules
        .route(
            "/molecules",
            get(handlers::list_molecules).post(handlers::create_molecule),
        )
        .route("/molecules/process_smiles", post(handlers::process_smiles))
        .route("/molecules/process_mol_file", post(handlers::process_mol_file))
        .route(
            "/molecules/{id}",
            get(handlers::get_molecule)
                .put(handlers::update_molecule)
                .delete(handlers::delete_molecule),
        )
        // Predictions (read-only)
        .route("/predictions", get(handlers::list_predictions))
        .route("/predictions/{id}", get(handlers::get_prediction))
        // Query logs (read-only)
        .route("/queries", get(handlers::list_queries))
        .route("/queries/{id}", get(handlers::get_query))
        // Drug database and dashboard
        .route("/drug-database/search", post(handlers::drug_search))
        .route("/admin-dashboard/stats", get(handlers::admin_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
