//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! error body carries `error` and `status`; validation failures add a
//! `fields` map.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use molecula_core::operations::{OperationError, field_messages};
use molecula_db::DbError;
use validator::ValidationErrors;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No credentials, or credentials that match no user.
    #[error("authentication credentials were not provided or are invalid")]
    Unauthenticated,

    /// The caller is authenticated but not privileged.
    #[error("you do not have permission to perform this action")]
    Forbidden,

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body failed validation.
    #[error("{message}")]
    Validation {
        /// Summary message.
        message: String,
        /// Per-field messages.
        fields: BTreeMap<String, Vec<String>>,
    },

    /// The request was well-formed but could not be carried out.
    #[error("{0}")]
    BadRequest(String),

    /// An internal error occurred. The detail is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation {
            message: "invalid input".to_owned(),
            fields: field_messages(&errors),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation {
            message: rejection.body_text(),
            fields: BTreeMap::new(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => Self::NotFound(format!("{entity} {id}")),
            DbError::Constraint(msg) => Self::BadRequest(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<OperationError> for ApiError {
    fn from(err: OperationError) -> Self {
        match err {
            OperationError::Validation(errors) => errors.into(),
            OperationError::Domain { query_id, kind, .. } => Self::BadRequest(format!(
                "{} failed; see query log {query_id}",
                kind.label()
            )),
            OperationError::Tracker(e) => Self::Internal(e.to_string()),
            OperationError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, fields) = match self {
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Self::Unauthenticated.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, Self::Forbidden.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            Self::Validation { message, fields } => (StatusCode::BAD_REQUEST, message, Some(fields)),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                    None,
                )
            }
        };

        let mut body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });
        if let (Some(fields), Some(obj)) = (fields, body.as_object_mut()) {
            obj.insert("fields".to_owned(), serde_json::json!(fields));
        }

        (status, axum::Json(body)).into_response()
    }
}
