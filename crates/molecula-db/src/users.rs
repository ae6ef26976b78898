//! User persistence.
//!
//! Users are seeded from configuration at startup and looked up by bearer
//! token on every authenticated request.

use molecula_types::{User, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, write_error};

/// Operations on the `users` table.
pub struct UserStore<'a> {
    pool: &'a PgPool,
}

impl<'a> UserStore<'a> {
    /// Create a new user store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Constraint`] if the username or token is taken.
    pub async fn insert(&self, user: &User) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO users (id, username, email, first_name, last_name, is_staff, api_token)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id.into_inner())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_staff)
        .bind(&user.api_token)
        .execute(self.pool)
        .await
        .map_err(write_error)?;

        tracing::info!(user_id = %user.id, username = %user.username, "Inserted user");
        Ok(())
    }

    /// Fetch a user by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"SELECT id, username, email, first_name, last_name, is_staff, api_token
              FROM users WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Resolve a bearer token to its user.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"SELECT id, username, email, first_name, last_name, is_staff, api_token
              FROM users WHERE api_token = $1",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// List every user in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self) -> Result<Vec<User>, DbError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"SELECT id, username, email, first_name, last_name, is_staff, api_token
              FROM users ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    /// User ID.
    pub id: Uuid,
    /// Login name.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Privileged flag.
    pub is_staff: bool,
    /// Bearer token.
    pub api_token: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from(row.id),
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            is_staff: row.is_staff,
            api_token: row.api_token,
        }
    }
}
