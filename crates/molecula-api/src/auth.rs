//! Caller authentication.
//!
//! Requests authenticate with `Authorization: Bearer <token>` (the
//! `Token <token>` form is accepted too). The token is resolved against
//! the store's users; anything else is a 401.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use molecula_types::{User, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated user making the request.
#[derive(Debug, Clone)]
pub struct Caller(pub User);

impl Caller {
    /// Reject non-privileged callers with a 403.
    pub const fn require_staff(&self) -> Result<(), ApiError> {
        if self.0.is_staff {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// Owner restriction for query log reads: `None` for privileged
    /// callers, the caller's own ID otherwise.
    pub const fn log_scope(&self) -> Option<UserId> {
        if self.0.is_staff {
            None
        } else {
            Some(self.0.id)
        }
    }
}

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(ApiError::Unauthenticated)?;

        let user = state
            .store
            .find_user_by_token(token)
            .await?
            .ok_or(ApiError::Unauthenticated)?;

        tracing::debug!(user_id = %user.id, username = %user.username, "Authenticated caller");
        Ok(Self(user))
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    let known = scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token");
    (known && !token.is_empty()).then_some(token)
}
