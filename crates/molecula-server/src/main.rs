//! Server binary for the Molecula service.
//!
//! Wires together configuration, the entity store, the structure
//! processor, and the HTTP API.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `molecula-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Open the store: PostgreSQL when `database.url` is set, memory otherwise
//! 4. Seed configured users
//! 5. Serve the HTTP API until shutdown

mod error;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use molecula_api::{AppState, ServerConfig};
use molecula_core::config::{AppConfig, DatabaseConfig, LogFormat, LoggingConfig, UserSeed};
use molecula_core::processing::StructureProcessor;
use molecula_db::{PostgresConfig, PostgresPool, Store};
use molecula_types::User;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

const CONFIG_PATH: &str = "molecula-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the server fails.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        host = config.server.host,
        port = config.server.port,
        toolkit = ?config.processing.toolkit,
        seeded_users = config.users.len(),
        "molecula-server starting"
    );

    // 3. Open the store.
    let store = open_store(&config).await?;

    // 4. Seed users.
    for seed in &config.users {
        seed_user(&store, seed).await?;
    }

    // 5. Serve.
    let processor = StructureProcessor::from_config(&config.processing);
    let state = Arc::new(AppState::new(store, processor));
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    molecula_api::start_server(&server_config, state).await?;

    info!("molecula-server shutdown complete");
    Ok(())
}

/// Load configuration from `molecula-config.yaml` in the working
/// directory, falling back to defaults. Environment overrides apply in
/// both cases.
fn load_config() -> Result<AppConfig, AppError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        return Ok(AppConfig::from_file(config_path)?);
    }
    let mut config = AppConfig::default();
    config.apply_env_overrides()?;
    Ok(config)
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

async fn open_store(config: &AppConfig) -> Result<Store, AppError> {
    let Some(url) = config.database.url.as_deref() else {
        info!("No database URL configured, using in-memory store");
        return Ok(Store::memory());
    };

    let pool = PostgresPool::connect(&postgres_config(url, &config.database)).await?;
    if config.database.run_migrations {
        pool.run_migrations().await?;
    }
    pool.ping().await?;
    info!(max_connections = config.database.max_connections, "PostgreSQL store ready");
    Ok(pool.into())
}

fn postgres_config(url: &str, database: &DatabaseConfig) -> PostgresConfig {
    PostgresConfig::new(url)
        .with_max_connections(database.max_connections)
        .with_connect_timeout(Duration::from_secs(database.connect_timeout_secs))
        .with_idle_timeout(Duration::from_secs(database.idle_timeout_secs))
}

/// Build the user record for a seed entry.
fn user_from_seed(seed: &UserSeed) -> User {
    let mut user = User::new(&seed.username, &seed.token);
    user.email.clone_from(&seed.email);
    user.first_name.clone_from(&seed.first_name);
    user.last_name.clone_from(&seed.last_name);
    user.is_staff = seed.staff;
    user
}

/// Insert a seed user unless a user with the same token exists.
async fn seed_user(store: &Store, seed: &UserSeed) -> Result<(), AppError> {
    let seed_error = |message: String| AppError::Seed {
        username: seed.username.clone(),
        message,
    };

    if seed.token.trim().is_empty() {
        return Err(seed_error("token must not be blank".to_owned()));
    }
    let existing = store
        .find_user_by_token(&seed.token)
        .await
        .map_err(|e| seed_error(e.to_string()))?;
    if existing.is_some() {
        tracing::debug!(username = seed.username, "Seed user already present");
        return Ok(());
    }

    let user = user_from_seed(seed);
    store
        .insert_user(&user)
        .await
        .map_err(|e| seed_error(e.to_string()))?;
    info!(username = seed.username, user_id = %user.id, staff = seed.staff, "Seeded user");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn seed(username: &str, token: &str, staff: bool) -> UserSeed {
        UserSeed {
            username: username.to_owned(),
            token: token.to_owned(),
            email: format!("{username}@example.org"),
            first_name: String::new(),
            last_name: String::new(),
            staff,
        }
    }

    #[tokio::test]
    async fn seeding_is_idempotent_by_token() {
        let store = Store::memory();
        let admin = seed("admin", "admin-token", true);

        seed_user(&store, &admin).await.unwrap();
        seed_user(&store, &admin).await.unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        let user = store.find_user_by_token("admin-token").await.unwrap().unwrap();
        assert!(user.is_staff);
        assert_eq!(user.email, "admin@example.org");
    }

    #[test]
    fn pool_settings_follow_database_config() {
        let database = DatabaseConfig {
            url: Some("postgresql://molecula@localhost/molecula".to_owned()),
            max_connections: 3,
            connect_timeout_secs: 2,
            idle_timeout_secs: 45,
            run_migrations: false,
        };
        let pg = postgres_config("postgresql://molecula@localhost/molecula", &database);
        assert_eq!(pg.max_connections, 3);
        assert_eq!(pg.connect_timeout, Duration::from_secs(2));
        assert_eq!(pg.idle_timeout, Duration::from_secs(45));
    }

    #[tokio::test]
    async fn blank_token_is_rejected() {
        let store = Store::memory();
        let result = seed_user(&store, &seed("ghost", "  ", false)).await;
        assert!(matches!(result, Err(AppError::Seed { .. })));
        assert!(store.list_users().await.unwrap().is_empty());
    }
}
