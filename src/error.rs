//! Error types and handling for the journal backend

use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use std::borrow::Cow;
use thiserror::Error;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

/// Custom error types for the application
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Field validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// A unique constraint would be broken by the write
    #[error("{message}")]
    UniquenessViolation { field: String, message: String },

    /// A foreign key does not resolve
    #[error("Referenced {field} does not exist")]
    ReferenceNotFound { field: String },

    /// Not found errors
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Signup with an email that is already registered
    #[error("Email already registered")]
    DuplicateEmail,

    /// Login failure
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Blob storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Bcrypt errors
    #[error("Bcrypt error: {0}")]
    Bcrypt(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Bad request errors
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Request ID for tracking
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AppError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        AppError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn unique(field: &str, message: impl Into<String>) -> Self {
        AppError::UniquenessViolation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn reference(field: &str) -> Self {
        AppError::ReferenceNotFound {
            field: field.to_string(),
        }
    }

    /// Single-field validation failure.
    pub fn invalid_field(field: &'static str, code: &'static str, message: &'static str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(
            field,
            ValidationError::new(code).with_message(Cow::Borrowed(message)),
        );
        AppError::Validation(errors)
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::UniquenessViolation { .. }
            | AppError::ReferenceNotFound { .. }
            | AppError::DuplicateEmail
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Authentication(_) | AppError::Jwt(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_)
            | AppError::UniquenessViolation { .. }
            | AppError::ReferenceNotFound { .. } => "VALIDATION_ERROR",
            AppError::DuplicateEmail => "DUPLICATE_EMAIL",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Authentication(_) => "AUTHENTICATION_ERROR",
            AppError::Authorization(_) => "AUTHORIZATION_ERROR",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::RateLimit => "RATE_LIMIT_EXCEEDED",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Jwt(_) => "INVALID_TOKEN",
            AppError::Database(sqlx::Error::RowNotFound) => "NOT_FOUND",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Check if this error is an operational error (expected errors)
    pub fn is_operational(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Field-level messages, if this error carries any.
    pub fn field_details(&self) -> Option<Map<String, Value>> {
        let mut details = Map::new();
        match self {
            AppError::Validation(errors) => {
                for (field, errors) in errors.field_errors() {
                    let messages = errors
                        .iter()
                        .map(|e| {
                            let text = e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string());
                            Value::String(text)
                        })
                        .collect();
                    details.insert(field.to_string(), Value::Array(messages));
                }
            }
            AppError::UniquenessViolation { field, message } => {
                details.insert(field.clone(), json!([message]));
            }
            AppError::ReferenceNotFound { field } => {
                details.insert(field.clone(), json!([self.to_string()]));
            }
            AppError::DuplicateEmail => {
                details.insert("email".to_string(), json!([self.to_string()]));
            }
            _ => return None,
        }
        Some(details)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server-side failures are logged in full and reported vaguely
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let mut error = json!({
            "code": self.error_code(),
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let (Some(details), Some(obj)) = (self.field_details(), error.as_object_mut()) {
            obj.insert("details".to_string(), Value::Object(details));
        }

        let body = Json(json!({
            "success": false,
            "error": error,
        }));

        (status, body).into_response()
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Convert bcrypt errors to AppError
impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Bcrypt(err.to_string())
    }
}

/// Convert JSON body rejections to AppError
impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        match err {
            JsonRejection::JsonDataError(err) => {
                AppError::BadRequest(format!("Invalid JSON: {}", err.body_text()))
            }
            JsonRejection::JsonSyntaxError(err) => {
                AppError::BadRequest(format!("JSON syntax error: {}", err.body_text()))
            }
            JsonRejection::MissingJsonContentType(_) => {
                AppError::BadRequest("Missing JSON content type".to_string())
            }
            _ => AppError::BadRequest("Invalid request body".to_string()),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(err: PathRejection) -> Self {
        AppError::BadRequest(format!("Invalid path parameter: {}", err.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        AppError::BadRequest(format!("Invalid query string: {}", err.body_text()))
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}
