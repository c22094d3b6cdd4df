use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation fails")]
    Validation(FieldErrors),
    /// Duplicate value for a unique field (e.g. email on registration).
    #[error("conflict on {0}")]
    Conflict(&'static str),
    /// Login failure. Deliberately identical for unknown email and wrong
    /// password so the endpoint cannot be used for user enumeration.
    #[error("invalid user credential")]
    InvalidCredentials,
    #[error("user not authenticated")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({ "message": "Validation fails", "errors": errors }),
            ),
            Self::Conflict(field) => {
                let mut errors = serde_json::Map::new();
                errors.insert(
                    field.to_string(),
                    serde_json::json!([format!("The {} has already been taken", field)]),
                );
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    serde_json::json!({ "message": "Validation fails", "errors": errors }),
                )
            }
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "message": "Invalid user credential!" }),
            ),
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "message": "User not authenticated" }),
            ),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                serde_json::json!({ "message": "You do not own this product" }),
            ),
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "message": "Product not found" }),
            ),
            Self::Internal(e) => {
                // Logged server-side; the client gets a generic message.
                error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "message": "Oops! Something went wrong" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_body_does_not_leak_cause() {
        let err = ApiError::Internal(anyhow::anyhow!("db path /var/secret.db missing"));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_maps_to_unprocessable() {
        let resp = ApiError::Conflict("email").into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
