//! Error types for the server binary.

/// Top-level error for the server binary.
///
/// Each variant wraps a subsystem error so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: molecula_core::config::ConfigError,
    },

    /// Connecting to or migrating the database failed.
    #[error("database error: {source}")]
    Db {
        /// The underlying store error.
        #[from]
        source: molecula_db::DbError,
    },

    /// Seeding a configured user failed.
    #[error("seed error for user {username}: {message}")]
    Seed {
        /// Username from the seed entry.
        username: String,
        /// Description of the failure.
        message: String,
    },

    /// The HTTP server failed to start or stopped with an error.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: molecula_api::ServerError,
    },
}
