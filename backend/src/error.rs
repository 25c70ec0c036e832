//! Error handling for the warehouse inventory service
//!
//! Every failure surfaces as one `AppError`; the HTTP layer maps it to a
//! status code and a stable machine-readable code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i32, requested: i32 },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    /// Shorthand for a field-level validation failure
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Whether the whole unit of work may be retried as-is.
    ///
    /// Serialization failures (40001) and deadlocks (40P01) abort the
    /// transaction before anything is committed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::DatabaseError(sqlx::Error::Database(db)) => {
                matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
            }
            _ => false,
        }
    }

    /// Translate constraint violations into domain errors.
    ///
    /// `resource` names the field being written, reported for unique
    /// violations on constraints not listed in [`constraint_target`].
    pub fn from_write(err: sqlx::Error, resource: &str) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let known = db.constraint().and_then(constraint_target);
            match (db.code().as_deref(), known) {
                (Some("23505"), Some(ConstraintTarget::Field(field))) => {
                    return AppError::DuplicateEntry(field.to_string());
                }
                (Some("23505"), _) => return AppError::DuplicateEntry(resource.to_string()),
                (Some("23503"), Some(ConstraintTarget::Reference(target))) => {
                    return AppError::NotFound(target.to_string());
                }
                (Some("23503"), _) => return AppError::NotFound("Referenced record".to_string()),
                _ => {}
            }
        }
        AppError::DatabaseError(err)
    }

    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message: message.clone(),
                    field: None,
                },
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_REQUEST".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_ENTRY".to_string(),
                    message: format!("A record with this {} already exists", field),
                    field: Some(field.clone()),
                },
            ),
            AppError::Conflict { resource, message } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message: message.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{} not found", resource),
                    field: None,
                },
            ),
            AppError::InsufficientStock {
                available,
                requested,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message: format!(
                        "Insufficient stock. Available: {}, requested: {}",
                        available, requested
                    ),
                    field: Some("quantity".to_string()),
                },
            ),
            AppError::DatabaseError(sqlx::Error::PoolTimedOut) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "DATABASE_UNAVAILABLE".to_string(),
                    message: "The database is busy, please retry".to_string(),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message: "A database error occurred".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred".to_string(),
                    field: None,
                },
            ),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_default();
        AppError::Validation {
            field,
            message: errors.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// What a named schema constraint protects
#[derive(Debug, PartialEq)]
enum ConstraintTarget {
    /// Unique column, reported as the offending field
    Field(&'static str),
    /// Foreign key, reported as the missing resource
    Reference(&'static str),
}

fn constraint_target(constraint: &str) -> Option<ConstraintTarget> {
    let target = match constraint {
        "sku_sku_code_key" => ConstraintTarget::Field("sku_code"),
        "category_name_key" | "supplier_name_key" => ConstraintTarget::Field("name"),
        "sku_category_id_fkey" => ConstraintTarget::Reference("Category"),
        "sku_supplier_id_fkey" => ConstraintTarget::Reference("Supplier"),
        "stock_transaction_sku_id_fkey" => ConstraintTarget::Reference("SKU"),
        _ => return None,
    };
    Some(target)
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::SimulatedDbError;

    #[test]
    fn test_insufficient_stock_maps_to_422() {
        let (status, detail) = AppError::InsufficientStock {
            available: 5,
            requested: 8,
        }
        .status_and_detail();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(detail.code, "INSUFFICIENT_STOCK");
        assert!(detail.message.contains("Available: 5"));
    }

    #[test]
    fn test_invalid_request_maps_to_400() {
        let (status, detail) =
            AppError::InvalidRequest("wrong direction".to_string()).status_and_detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.code, "INVALID_REQUEST");
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let (status, detail) = AppError::NotFound("SKU".to_string()).status_and_detail();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(detail.message, "SKU not found");
    }

    #[test]
    fn test_pool_timeout_is_service_unavailable() {
        let (status, _) = AppError::DatabaseError(sqlx::Error::PoolTimedOut).status_and_detail();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    fn db_error(code: &str, constraint: Option<&str>) -> sqlx::Error {
        SimulatedDbError::new(code, constraint).into()
    }

    #[test]
    fn test_serialization_failures_and_deadlocks_are_transient() {
        assert!(AppError::DatabaseError(db_error("40001", None)).is_transient());
        assert!(AppError::DatabaseError(db_error("40P01", None)).is_transient());
    }

    #[test]
    fn test_only_database_conflicts_are_transient() {
        assert!(!AppError::DatabaseError(db_error("23505", Some("sku_sku_code_key"))).is_transient());
        assert!(!AppError::DatabaseError(sqlx::Error::RowNotFound).is_transient());
        assert!(!AppError::InvalidRequest("x".to_string()).is_transient());
    }

    #[test]
    fn test_unique_violation_reports_column_not_constraint() {
        let err = AppError::from_write(db_error("23505", Some("sku_sku_code_key")), "sku_code");
        assert!(matches!(err, AppError::DuplicateEntry(ref f) if f == "sku_code"));

        let err = AppError::from_write(db_error("23505", Some("category_name_key")), "name");
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(detail.field.as_deref(), Some("name"));
        assert!(!detail.message.contains("_key"));
    }

    #[test]
    fn test_unknown_unique_constraint_falls_back_to_written_field() {
        let err = AppError::from_write(db_error("23505", Some("sku_legacy_idx")), "sku_code");
        assert!(matches!(err, AppError::DuplicateEntry(ref f) if f == "sku_code"));

        let err = AppError::from_write(db_error("23505", None), "name");
        assert!(matches!(err, AppError::DuplicateEntry(ref f) if f == "name"));
    }

    #[test]
    fn test_foreign_key_violation_names_missing_resource() {
        let err = AppError::from_write(db_error("23503", Some("sku_category_id_fkey")), "sku_code");
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(detail.message, "Category not found");

        let err = AppError::from_write(
            db_error("23503", Some("stock_transaction_sku_id_fkey")),
            "stock_transaction",
        );
        assert!(matches!(err, AppError::NotFound(ref r) if r == "SKU"));

        let err = AppError::from_write(db_error("23503", Some("something_else_fkey")), "name");
        assert!(matches!(err, AppError::NotFound(ref r) if r == "Referenced record"));
    }

    #[test]
    fn test_other_database_errors_pass_through() {
        let err = AppError::from_write(db_error("40001", None), "name");
        assert!(err.is_transient());
        assert_eq!(err.status_and_detail().0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
