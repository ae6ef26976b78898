//! Pooled `PostgreSQL` access for the durable store.
//!
//! Users, molecules, the prediction tree and the query log all live in the
//! tables created by `migrations/`. Deleting a molecule cascades to its
//! predictions and nulls the molecule reference on its query logs; those
//! rules sit in the foreign keys, not in Rust.
//!
//! Statements are built at runtime with bound parameters, so building the
//! crate never needs a reachable database.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::error::DbError;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Pool settings for the Molecula database.
///
/// Built from the `database` section of the service configuration; the
/// `with_*` methods override one setting each.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Connection string, e.g. `postgresql://molecula:secret@db:5432/molecula`.
    pub url: String,
    /// Upper bound on open connections.
    pub max_connections: u32,
    /// How long a request waits for a free connection.
    pub connect_timeout: Duration,
    /// How long an unused connection is kept before it is closed.
    pub idle_timeout: Duration,
}

impl PostgresConfig {
    /// Settings for `url` with the stock pool limits.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Cap the pool at `max` connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Fail a connection checkout after `timeout`.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Close connections that sit unused for `timeout`.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

/// Shared handle to the Molecula database.
///
/// Cloning is cheap. The entity stores ([`crate::UserStore`],
/// [`crate::MoleculeStore`], [`crate::PredictionStore`],
/// [`crate::QueryLogStore`]) run their statements against
/// [`PostgresPool::pool`].
#[derive(Debug, Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Open a pool with the given settings.
    ///
    /// # Errors
    ///
    /// [`DbError::Config`] when the URL does not parse, [`DbError::Postgres`]
    /// when the server cannot be reached.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DbError> {
        let options: PgConnectOptions = config
            .url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("Invalid database URL: {e}")))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_with(options)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            connect_timeout_secs = config.connect_timeout.as_secs(),
            idle_timeout_secs = config.idle_timeout.as_secs(),
            "Molecula database pool opened"
        );
        Ok(Self { pool })
    }

    /// Open a pool for `url` with the stock limits.
    ///
    /// # Errors
    ///
    /// Same as [`PostgresPool::connect`].
    pub async fn connect_url(url: &str) -> Result<Self, DbError> {
        Self::connect(&PostgresConfig::new(url)).await
    }

    /// Bring the schema up to date: users, molecules, predictions and the
    /// query log.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] if any migration fails.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Molecula schema migrated");
        Ok(())
    }

    /// Check that the database answers a trivial query.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if it does not.
    pub async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// The underlying [`PgPool`].
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}
