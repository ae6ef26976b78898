//! Shared application state for the HTTP API.
//!
//! [`AppState`] carries the explicit handles every handler needs: the
//! entity [`Store`] and the [`StructureProcessor`]. It is wrapped in an
//! `Arc` and injected through Axum's `State` extractor.

use molecula_core::operations::OperationRunner;
use molecula_core::processing::StructureProcessor;
use molecula_db::Store;

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The entity store.
    pub store: Store,
    /// The structure processing toolkit.
    pub processor: StructureProcessor,
}

impl AppState {
    /// Create application state from its parts.
    pub const fn new(store: Store, processor: StructureProcessor) -> Self {
        Self { store, processor }
    }

    /// State backed by a fresh in-memory store and the passthrough toolkit.
    pub fn in_memory() -> Self {
        Self::new(Store::memory(), StructureProcessor::Passthrough)
    }

    /// An operation runner bound to this state.
    pub const fn runner(&self) -> OperationRunner<'_> {
        OperationRunner::new(&self.store, &self.processor)
    }
}
