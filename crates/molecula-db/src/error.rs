//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] errors and adds the store-level failures that both backends
//! report the same way (missing rows, broken references, unique keys).

use molecula_types::UnknownVariant;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped back onto a domain enum.
    #[error("Decode error: {0}")]
    Decode(#[from] UnknownVariant),

    /// The addressed record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record (e.g. `"molecule"`).
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A write would break a reference or uniqueness rule.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Build a [`DbError::NotFound`] for any displayable identifier.
    pub fn not_found(entity: &'static str, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Classify a failed write: key and check violations become
/// [`DbError::Constraint`], everything else stays a [`DbError::Postgres`].
pub(crate) fn write_error(err: sqlx::Error) -> DbError {
    match &err {
        sqlx::Error::Database(db)
            if db.is_unique_violation()
                || db.is_foreign_key_violation()
                || db.is_check_violation() =>
        {
            DbError::Constraint(db.message().to_owned())
        }
        _ => DbError::Postgres(err),
    }
}
