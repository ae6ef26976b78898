//! Query lifecycle tracker.
//!
//! Drives a [`QueryLog`] through `pending -> processing -> completed | failed`
//! and persists every transition as one store write.
//!
//! # Transitions
//!
//! - [`QueryTracker::open`] allocates the log in `pending`, moves it to
//!   `processing`, and inserts it. The first persisted state is
//!   `processing`.
//! - [`QueryTracker::succeed`] and [`QueryTracker::fail`] apply the
//!   terminal transition to a copy and write it conditionally: the store
//!   only accepts it while the stored row is still `processing`. The
//!   caller's log is replaced only after the write lands, so a failed or
//!   rejected write never leaves the caller holding a state the store
//!   does not have.

use molecula_db::{DbError, Store};
use molecula_types::{
    InvalidTransition, MoleculeId, QueryLog, QueryLogId, QueryStatus, QueryType, UserId,
};

/// Errors raised by the tracker.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The requested transition is not an edge of the lifecycle, or the
    /// stored log already left `processing`.
    #[error("invalid state transition for query log {id}: {from} -> {to}")]
    InvalidStateTransition {
        /// The log being transitioned.
        id: QueryLogId,
        /// State the log was in.
        from: QueryStatus,
        /// State that was requested.
        to: QueryStatus,
    },

    /// The log disappeared from the store.
    #[error("query log not found: {0}")]
    NotFound(QueryLogId),

    /// The store failed.
    #[error("store error: {0}")]
    Store(#[from] DbError),
}

/// Creates and closes query logs against a [`Store`].
pub struct QueryTracker<'a> {
    store: &'a Store,
}

impl<'a> QueryTracker<'a> {
    /// Create a tracker bound to a store.
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Open a log for a new operation and persist it as `processing`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Store`] if the insert fails.
    pub async fn open(
        &self,
        user: UserId,
        query_type: QueryType,
        payload: Option<String>,
    ) -> Result<QueryLog, TrackerError> {
        let mut log = QueryLog::new(user, query_type, payload);
        log.begin().map_err(|err| invalid(log.id, err))?;
        self.store.insert_query_log(&log).await?;

        tracing::debug!(
            query_id = %log.id,
            query_type = %query_type,
            user_id = %user,
            "Opened query log"
        );
        Ok(log)
    }

    /// Close a log as `completed`, linking the produced molecule if any.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidStateTransition`] if the log is not
    /// `processing`, [`TrackerError::NotFound`] if it vanished, or
    /// [`TrackerError::Store`] if the write fails.
    pub async fn succeed(
        &self,
        log: &mut QueryLog,
        molecule: Option<MoleculeId>,
    ) -> Result<(), TrackerError> {
        let mut next = log.clone();
        next.complete(molecule).map_err(|err| invalid(log.id, err))?;
        self.commit(log, next).await
    }

    /// Close a log as `failed` with an error detail.
    ///
    /// # Errors
    ///
    /// Same as [`QueryTracker::succeed`].
    pub async fn fail(&self, log: &mut QueryLog, detail: &str) -> Result<(), TrackerError> {
        let mut next = log.clone();
        next.fail(detail).map_err(|err| invalid(log.id, err))?;
        self.commit(log, next).await
    }

    async fn commit(&self, log: &mut QueryLog, next: QueryLog) -> Result<(), TrackerError> {
        if self.store.finish_query_log(&next).await? {
            tracing::info!(
                query_id = %next.id,
                query_type = %next.query_type,
                status = %next.status,
                molecule_id = ?next.molecule.map(|m| m.to_string()),
                "Closed query log"
            );
            *log = next;
            return Ok(());
        }

        // The conditional write was refused: report what the store holds.
        let stored = self
            .store
            .get_query_log(next.id)
            .await?
            .ok_or(TrackerError::NotFound(next.id))?;
        tracing::error!(
            query_id = %next.id,
            stored = %stored.status,
            requested = %next.status,
            "Query log already left processing"
        );
        Err(TrackerError::InvalidStateTransition {
            id: next.id,
            from: stored.status,
            to: next.status,
        })
    }
}

fn invalid(id: QueryLogId, err: InvalidTransition) -> TrackerError {
    tracing::error!(query_id = %id, from = %err.from, to = %err.to, "Illegal query log transition");
    TrackerError::InvalidStateTransition {
        id,
        from: err.from,
        to: err.to,
    }
}
