//! Error types and HTTP error response handling.
//!
//! Every handler returns `Result<T, AppError>`; the `IntoResponse`
//! implementation turns each variant into a status code and a JSON body.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::db::{is_foreign_key_violation, is_unique_violation};

/// Field-level validation messages, keyed by request field name.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`. The first message per field wins.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// `Ok(())` when no field failed, otherwise `AppError::Validation`.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Database Errors**: any `sqlx::Error`; unique and foreign-key violations become conflicts
/// - **Authentication Errors**: missing or unknown bearer token
/// - **Resource Errors**: the requested record does not exist
/// - **Validation Errors**: per-field request problems
/// - **Business Rule Errors**: the request is well-formed but not allowed in the current state
/// - **Upstream Errors**: WhatsApp API or SMTP server failures
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid or missing API token")]
    Unauthorized,

    /// Returns HTTP 404. Carries the entity name, e.g. `"fornecedor"`.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Returns HTTP 400 with a `fields` map.
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Returns HTTP 400.
    #[error("{0}")]
    InvalidRequest(String),

    /// Returns HTTP 409.
    #[error("{0}")]
    Conflict(String),

    /// Returns HTTP 422 Unprocessable Entity.
    #[error("{0}")]
    BusinessRule(String),

    /// Returns HTTP 502 Bad Gateway.
    #[error("Upstream service error: {0}")]
    Upstream(String),
}

impl AppError {
    /// Validation error for a single field.
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        AppError::Validation(errors)
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(err) if is_unique_violation(err) || is_foreign_key_violation(err) => {
                StatusCode::CONFLICT
            }
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BusinessRule(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "validation_error",
///     "message": "Validation failed",
///     "fields": { "documento": "CPF inválido" }
///   }
/// }
/// ```
///
/// `fields` is present only for validation errors. Database error details
/// are logged and never sent to the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (code, message, fields) = match self {
            AppError::Database(ref err) if is_unique_violation(err) => (
                "conflict".to_string(),
                "Record already exists".to_string(),
                None,
            ),
            AppError::Database(ref err) if is_foreign_key_violation(err) => (
                "conflict".to_string(),
                "Record is referenced by or references another record".to_string(),
                None,
            ),
            AppError::Database(ref err) => {
                tracing::error!(error = %err, "database error");
                (
                    "internal_error".to_string(),
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            AppError::Unauthorized => ("unauthorized".to_string(), self.to_string(), None),
            AppError::NotFound(entity) => (format!("{entity}_not_found"), self.to_string(), None),
            AppError::Validation(fields) => (
                "validation_error".to_string(),
                "Validation failed".to_string(),
                Some(fields),
            ),
            AppError::InvalidRequest(msg) => ("invalid_request".to_string(), msg, None),
            AppError::Conflict(msg) => ("conflict".to_string(), msg, None),
            AppError::BusinessRule(msg) => ("business_rule_violation".to_string(), msg, None),
            AppError::Upstream(msg) => {
                tracing::warn!(error = %msg, "upstream failure");
                ("upstream_error".to_string(), msg, None)
            }
        };

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let Some(fields) = fields {
            error["fields"] = json!(fields);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_per_field_is_kept() {
        let mut errors = FieldErrors::new();
        errors.add("nome", "obrigatório");
        errors.add("nome", "muito longo");
        assert_eq!(errors.get("nome"), Some("obrigatório"));
    }

    #[test]
    fn empty_field_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("pedido").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::field("x", "y").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::BusinessRule("no".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::Upstream("down".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
