//! Query log persistence (append-only audit trail).
//!
//! Logs are inserted once and updated once more, by [`QueryLogStore::finish`],
//! which only applies while the stored row is still `processing`. There is
//! no delete.

use chrono::{DateTime, Utc};
use molecula_types::{MoleculeId, QueryLog, QueryLogId, QueryStatus, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, write_error};

const SELECT_QUERY_LOG: &str = r"SELECT id, user_id, molecule_id, query_type, query_data, status, error_message, created_at, completed_at
      FROM query_logs";

/// Operations on the `query_logs` table.
pub struct QueryLogStore<'a> {
    pool: &'a PgPool,
}

impl<'a> QueryLogStore<'a> {
    /// Create a new query log store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a query log in whatever state it currently holds.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Constraint`] if the user or molecule does not exist.
    pub async fn insert(&self, log: &QueryLog) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO query_logs (id, user_id, molecule_id, query_type, query_data, status, error_message, created_at, completed_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(log.id.into_inner())
        .bind(log.user.into_inner())
        .bind(log.molecule.map(MoleculeId::into_inner))
        .bind(log.query_type.as_str())
        .bind(&log.query_data)
        .bind(log.status.as_str())
        .bind(&log.error_message)
        .bind(log.created_at)
        .bind(log.completed_at)
        .execute(self.pool)
        .await
        .map_err(write_error)?;

        Ok(())
    }

    /// Fetch a query log by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Decode`] if a stored enum value is unknown.
    pub async fn get(&self, id: QueryLogId) -> Result<Option<QueryLog>, DbError> {
        let row = sqlx::query_as::<_, QueryLogRow>(&format!("{SELECT_QUERY_LOG} WHERE id = $1"))
            .bind(id.into_inner())
            .fetch_optional(self.pool)
            .await?;

        row.map(QueryLog::try_from).transpose()
    }

    /// List logs in creation order, optionally restricted to one owner.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Decode`] if a stored enum value is unknown.
    pub async fn list(&self, owner: Option<UserId>) -> Result<Vec<QueryLog>, DbError> {
        let rows = sqlx::query_as::<_, QueryLogRow>(&format!(
            "{SELECT_QUERY_LOG} WHERE ($1::UUID IS NULL OR user_id = $1) ORDER BY created_at, id"
        ))
        .bind(owner.map(UserId::into_inner))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(QueryLog::try_from).collect()
    }

    /// List the logs that reference a molecule.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Decode`] if a stored enum value is unknown.
    pub async fn list_for_molecule(&self, molecule: MoleculeId) -> Result<Vec<QueryLog>, DbError> {
        let rows = sqlx::query_as::<_, QueryLogRow>(&format!(
            "{SELECT_QUERY_LOG} WHERE molecule_id = $1 ORDER BY created_at, id"
        ))
        .bind(molecule.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(QueryLog::try_from).collect()
    }

    /// Count every stored log.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn count(&self) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM query_logs")
            .fetch_one(self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Persist the terminal state of a log.
    ///
    /// The write is conditional on the stored row still being
    /// `processing`. Returns `false` when the condition did not hold (the
    /// row is missing or already terminal) and nothing was written.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn finish(&self, log: &QueryLog) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"UPDATE query_logs
              SET status = $2, molecule_id = $3, error_message = $4, completed_at = $5
              WHERE id = $1 AND status = $6",
        )
        .bind(log.id.into_inner())
        .bind(log.status.as_str())
        .bind(log.molecule.map(MoleculeId::into_inner))
        .bind(&log.error_message)
        .bind(log.completed_at)
        .bind(QueryStatus::Processing.as_str())
        .execute(self.pool)
        .await
        .map_err(write_error)?;

        Ok(result.rows_affected() == 1)
    }
}

/// A row from the `query_logs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueryLogRow {
    /// Log ID.
    pub id: Uuid,
    /// Submitting user.
    pub user_id: Uuid,
    /// Produced molecule, if any.
    pub molecule_id: Option<Uuid>,
    /// Query type as stored.
    pub query_type: String,
    /// Serialized input payload.
    pub query_data: Option<String>,
    /// Status as stored.
    pub status: String,
    /// Failure detail.
    pub error_message: Option<String>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Terminal transition time.
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<QueryLogRow> for QueryLog {
    type Error = DbError;

    fn try_from(row: QueryLogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: QueryLogId::from(row.id),
            user: UserId::from(row.user_id),
            molecule: row.molecule_id.map(MoleculeId::from),
            query_type: row.query_type.parse()?,
            query_data: row.query_data,
            status: row.status.parse()?,
            error_message: row.error_message,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}
