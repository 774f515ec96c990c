//! Standardized error handling for the RecordFlow API
//!
//! Every handler failure is rendered as an [`ApiError`] JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Standard API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code (e.g., "VALIDATION_ERROR", "NOT_FOUND")
    pub code: String,
    pub message: String,
    /// Field-level errors for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
    /// ISO 8601 timestamp
    pub timestamp: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: HashMap<String, Vec<String>>) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(resource: impl Into<String>) -> AppError {
        AppError::NotFound(resource.into())
    }
}

/// Application error type that can be converted to HTTP responses
#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),

    // Resource errors
    NotFound(String),
    Conflict(String),

    // Validation errors
    ValidationError { details: HashMap<String, Vec<String>> },
    BadRequest(String),

    // Server errors
    InternalError(String),
    DatabaseError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ValidationError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InternalError(_) | Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::InternalError(_) => "INTERNAL_ERROR",
            Self::DatabaseError(_) => "DATABASE_ERROR",
        }
    }

    /// Server-side details are logged and replaced by a generic message.
    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized(msg) => msg.clone(),
            Self::NotFound(resource) => format!("{} not found", resource),
            Self::Conflict(msg) => msg.clone(),
            Self::ValidationError { .. } => "Validation failed".to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                "A database error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut error = ApiError::new(self.error_code(), self.message());

        if let Self::ValidationError { details } = self {
            error = error.with_details(details);
        }

        (status, Json(error)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("Resource".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict("A resource with the same unique value already exists".to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Self::BadRequest("Referenced resource does not exist".to_string())
            }
            _ => Self::DatabaseError(err.to_string()),
        }
    }
}

/// Result type alias for handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Collects field-level validation errors
pub struct ValidationBuilder {
    details: HashMap<String, Vec<String>>,
}

impl ValidationBuilder {
    pub fn new() -> Self {
        Self {
            details: HashMap::new(),
        }
    }

    pub fn error(mut self, field: &str, message: &str) -> Self {
        self.add(field, message);
        self
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.details
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn build(self) -> Option<AppError> {
        if self.details.is_empty() {
            None
        } else {
            Some(AppError::ValidationError {
                details: self.details,
            })
        }
    }

    /// `Err` with every collected error, or `Ok` when there are none.
    pub fn finish(self) -> ApiResult<()> {
        match self.build() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.details.is_empty()
    }
}

impl Default for ValidationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
