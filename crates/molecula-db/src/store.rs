//! Backend-agnostic store handle.
//!
//! [`Store`] dispatches each operation to either the in-memory tables or
//! the `PostgreSQL` per-entity stores. Handlers receive a `Store` through
//! axum state and never know which backend is behind it.

use molecula_types::{
    Molecule, MoleculeId, Prediction, PredictionId, QueryLog, QueryLogId, User, UserId,
};

use crate::error::DbError;
use crate::memory::MemoryStore;
use crate::molecules::MoleculeStore;
use crate::postgres::PostgresPool;
use crate::predictions::PredictionStore;
use crate::query_logs::QueryLogStore;
use crate::users::UserStore;

/// The entity store: one of the two interchangeable backends.
#[derive(Debug, Clone)]
pub enum Store {
    /// In-process tables, used for tests and database-less runs.
    Memory(MemoryStore),
    /// `PostgreSQL` via `sqlx`.
    Postgres(PostgresPool),
}

impl Store {
    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Short backend name for logs and health output.
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }

    // -----------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------

    /// Insert a user.
    pub async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        match self {
            Self::Memory(m) => m.insert_user(user).await,
            Self::Postgres(pg) => UserStore::new(pg.pool()).insert(user).await,
        }
    }

    /// Fetch a user by ID.
    pub async fn get_user(&self, id: UserId) -> Result<Option<User>, DbError> {
        match self {
            Self::Memory(m) => m.get_user(id).await,
            Self::Postgres(pg) => UserStore::new(pg.pool()).get(id).await,
        }
    }

    /// Resolve a bearer token to its user.
    pub async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, DbError> {
        match self {
            Self::Memory(m) => m.find_user_by_token(token).await,
            Self::Postgres(pg) => UserStore::new(pg.pool()).find_by_token(token).await,
        }
    }

    /// List every user.
    pub async fn list_users(&self) -> Result<Vec<User>, DbError> {
        match self {
            Self::Memory(m) => m.list_users().await,
            Self::Postgres(pg) => UserStore::new(pg.pool()).list().await,
        }
    }

    // -----------------------------------------------------------------
    // Molecules
    // -----------------------------------------------------------------

    /// Insert a molecule.
    pub async fn insert_molecule(&self, molecule: &Molecule) -> Result<(), DbError> {
        match self {
            Self::Memory(m) => m.insert_molecule(molecule).await,
            Self::Postgres(pg) => MoleculeStore::new(pg.pool()).insert(molecule).await,
        }
    }

    /// Fetch a molecule by ID.
    pub async fn get_molecule(&self, id: MoleculeId) -> Result<Option<Molecule>, DbError> {
        match self {
            Self::Memory(m) => m.get_molecule(id).await,
            Self::Postgres(pg) => MoleculeStore::new(pg.pool()).get(id).await,
        }
    }

    /// List every molecule.
    pub async fn list_molecules(&self) -> Result<Vec<Molecule>, DbError> {
        match self {
            Self::Memory(m) => m.list_molecules().await,
            Self::Postgres(pg) => MoleculeStore::new(pg.pool()).list().await,
        }
    }

    /// Overwrite the mutable fields of a molecule.
    pub async fn update_molecule(&self, molecule: &Molecule) -> Result<(), DbError> {
        match self {
            Self::Memory(m) => m.update_molecule(molecule).await,
            Self::Postgres(pg) => MoleculeStore::new(pg.pool()).update(molecule).await,
        }
    }

    /// Delete a molecule with cascade and set-null semantics.
    pub async fn delete_molecule(&self, id: MoleculeId) -> Result<(), DbError> {
        match self {
            Self::Memory(m) => m.delete_molecule(id).await,
            Self::Postgres(pg) => MoleculeStore::new(pg.pool()).delete(id).await,
        }
    }

    // -----------------------------------------------------------------
    // Predictions
    // -----------------------------------------------------------------

    /// Insert a prediction tree atomically.
    pub async fn insert_prediction(&self, prediction: &Prediction) -> Result<(), DbError> {
        match self {
            Self::Memory(m) => m.insert_prediction(prediction).await,
            Self::Postgres(pg) => PredictionStore::new(pg.pool()).insert(prediction).await,
        }
    }

    /// Fetch a prediction tree by ID.
    pub async fn get_prediction(&self, id: PredictionId) -> Result<Option<Prediction>, DbError> {
        match self {
            Self::Memory(m) => m.get_prediction(id).await,
            Self::Postgres(pg) => PredictionStore::new(pg.pool()).get(id).await,
        }
    }

    /// List every prediction tree.
    pub async fn list_predictions(&self) -> Result<Vec<Prediction>, DbError> {
        match self {
            Self::Memory(m) => m.list_predictions().await,
            Self::Postgres(pg) => PredictionStore::new(pg.pool()).list().await,
        }
    }

    /// List the prediction trees of one molecule.
    pub async fn list_predictions_for_molecule(
        &self,
        molecule: MoleculeId,
    ) -> Result<Vec<Prediction>, DbError> {
        match self {
            Self::Memory(m) => m.list_predictions_for_molecule(molecule).await,
            Self::Postgres(pg) => {
                PredictionStore::new(pg.pool())
                    .list_for_molecule(molecule)
                    .await
            }
        }
    }

    /// Delete a prediction tree.
    pub async fn delete_prediction(&self, id: PredictionId) -> Result<(), DbError> {
        match self {
            Self::Memory(m) => m.delete_prediction(id).await,
            Self::Postgres(pg) => PredictionStore::new(pg.pool()).delete(id).await,
        }
    }

    // -----------------------------------------------------------------
    // Query logs
    // -----------------------------------------------------------------

    /// Insert a query log.
    pub async fn insert_query_log(&self, log: &QueryLog) -> Result<(), DbError> {
        match self {
            Self::Memory(m) => m.insert_query_log(log).await,
            Self::Postgres(pg) => QueryLogStore::new(pg.pool()).insert(log).await,
        }
    }

    /// Fetch a query log by ID.
    pub async fn get_query_log(&self, id: QueryLogId) -> Result<Option<QueryLog>, DbError> {
        match self {
            Self::Memory(m) => m.get_query_log(id).await,
            Self::Postgres(pg) => QueryLogStore::new(pg.pool()).get(id).await,
        }
    }

    /// List logs, restricted to `owner` when given.
    pub async fn list_query_logs(&self, owner: Option<UserId>) -> Result<Vec<QueryLog>, DbError> {
        match self {
            Self::Memory(m) => m.list_query_logs(owner).await,
            Self::Postgres(pg) => QueryLogStore::new(pg.pool()).list(owner).await,
        }
    }

    /// List the logs that reference a molecule.
    pub async fn list_query_logs_for_molecule(
        &self,
        molecule: MoleculeId,
    ) -> Result<Vec<QueryLog>, DbError> {
        match self {
            Self::Memory(m) => m.list_query_logs_for_molecule(molecule).await,
            Self::Postgres(pg) => {
                QueryLogStore::new(pg.pool())
                    .list_for_molecule(molecule)
                    .await
            }
        }
    }

    /// Count every stored log.
    pub async fn count_query_logs(&self) -> Result<u64, DbError> {
        match self {
            Self::Memory(m) => m.count_query_logs().await,
            Self::Postgres(pg) => QueryLogStore::new(pg.pool()).count().await,
        }
    }

    /// Persist a terminal log state if the stored row is still
    /// `processing`. Returns whether the write applied.
    pub async fn finish_query_log(&self, log: &QueryLog) -> Result<bool, DbError> {
        match self {
            Self::Memory(m) => m.finish_query_log(log).await,
            Self::Postgres(pg) => QueryLogStore::new(pg.pool()).finish(log).await,
        }
    }
}

impl From<MemoryStore> for Store {
    fn from(store: MemoryStore) -> Self {
        Self::Memory(store)
    }
}

impl From<PostgresPool> for Store {
    fn from(pool: PostgresPool) -> Self {
        Self::Postgres(pool)
    }
}
