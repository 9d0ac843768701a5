/// Unified error handling for the service.
///
/// Expected failures travel as typed `Result` values; only genuinely
/// unexpected conditions (repository unavailable, broken configuration)
/// abort a request. Token failures keep their precise cause for internal
/// logging but collapse to one generic unauthorized response at the HTTP
/// boundary so the response never acts as an oracle for attackers.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Validation errors for caller-supplied input.
///
/// These concern the caller's own data, so they are surfaced with
/// field-level detail.
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(msg) => write!(f, "{}", msg),
        }
    }
}

impl StdError for ValidationError {}

/// Token decode failures, in the order the checks run.
///
/// Signature verification happens before the payload is even looked at, so a
/// forged token can never learn which later check it would have failed.
/// None of these variants is ever shown verbatim to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    InvalidSignature,
    Malformed,
    Expired,
    TypeMismatch,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::InvalidSignature => write!(f, "token signature does not verify"),
            TokenError::Malformed => write!(f, "token is malformed"),
            TokenError::Expired => write!(f, "token has expired"),
            TokenError::TypeMismatch => write!(f, "token is of the wrong kind"),
        }
    }
}

impl StdError for TokenError {}

/// Authentication and authorization failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown identifier or wrong password; callers cannot tell which.
    InvalidCredentials,
    /// No bearer token was presented at all.
    MissingToken,
    /// The presented token was rejected, or a refresh token was already
    /// rotated out or revoked.
    Unauthorized,
    /// The caller is logged in but may not perform this action.
    Forbidden,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "invalid credentials"),
            AuthError::MissingToken => write!(f, "missing authentication token"),
            AuthError::Unauthorized => write!(f, "unauthorized"),
            AuthError::Forbidden => write!(f, "forbidden"),
        }
    }
}

impl StdError for AuthError {}

/// Repository operation errors.
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    NotFound(String),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Central error type all application errors map to.
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Token(TokenError),
    Auth(AuthError),
    Database(DatabaseError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Token(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Token(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let error_msg = err.to_string();

        if error_msg.contains("duplicate key") || error_msg.contains("unique constraint") {
            AppError::Database(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            ))
        } else if error_msg.contains("no rows") {
            AppError::Database(DatabaseError::NotFound("Record not found".to_string()))
        } else if error_msg.contains("pool") || error_msg.contains("connect") {
            AppError::Database(DatabaseError::ConnectionPool(error_msg))
        } else {
            AppError::Database(DatabaseError::UnexpectedError(error_msg))
        }
    }
}

/// Error body returned to clients.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for correlating a client report with server logs.
    pub error_id: String,
    /// Human-readable error message.
    pub message: String,
    /// Error code for client-side handling.
    pub code: String,
    /// HTTP status code.
    pub status: u16,
    /// Field-level reasons, present for validation failures only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl AppError {
    fn to_response(&self, error_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message, errors) = match self {
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Validation failed".to_string(),
                Some(vec![e.to_string()]),
            ),

            // The precise decode failure is for the logs only.
            AppError::Token(_) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "You're not logged in.".to_string(),
                None,
            ),

            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    "Invalid email or password".to_string(),
                    None,
                ),
                AuthError::Forbidden => (
                    StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "You are not allowed to perform this action".to_string(),
                    None,
                ),
                AuthError::MissingToken | AuthError::Unauthorized => (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "You're not logged in.".to_string(),
                    None,
                ),
            },

            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => (
                    StatusCode::CONFLICT,
                    "DUPLICATE_ENTRY",
                    e.to_string(),
                    None,
                ),
                DatabaseError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string(), None)
                }
                DatabaseError::ConnectionPool(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service temporarily unavailable".to_string(),
                    None,
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                    None,
                ),
            },

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
                None,
            ),
        };

        let body = ErrorResponse {
            error_id: error_id.to_string(),
            message,
            code: code.to_string(),
            status: status.as_u16(),
            errors,
        };

        (status, body)
    }

    fn log(&self, error_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error_id = error_id, error = %e, "validation error");
            }
            AppError::Token(e) => {
                tracing::warn!(error_id = error_id, error = %e, "token rejected");
            }
            AppError::Auth(e) => {
                tracing::warn!(error_id = error_id, error = %e, "authentication error");
            }
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                tracing::warn!(error_id = error_id, error = %self, "duplicate entry attempt");
            }
            AppError::Database(e) => {
                tracing::error!(error_id = error_id, error = %e, "database error");
            }
            AppError::Internal(msg) => {
                tracing::error!(error_id = error_id, error = %msg, "internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log(&error_id);

        let (status, body) = self.to_response(&error_id);
        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthError::Forbidden) => StatusCode::FORBIDDEN,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
                DatabaseError::NotFound(_) => StatusCode::NOT_FOUND,
                DatabaseError::ConnectionPool(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Request-scoped context for correlating log lines of one operation.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display_names_the_field() {
        let err = ValidationError::EmptyField("email".to_string());
        assert_eq!(err.to_string(), "email is empty");
    }

    #[test]
    fn token_errors_all_map_to_unauthorized() {
        for e in [
            TokenError::InvalidSignature,
            TokenError::Malformed,
            TokenError::Expired,
            TokenError::TypeMismatch,
        ] {
            let app_err: AppError = e.into();
            assert_eq!(app_err.status_code(), StatusCode::UNAUTHORIZED);
            let (_, body) = app_err.to_response("test");
            // The specific failure must never leak into the response.
            assert_eq!(body.message, "You're not logged in.");
            assert_eq!(body.code, "UNAUTHORIZED");
        }
    }

    #[test]
    fn forbidden_maps_to_403() {
        let err: AppError = AuthError::Forbidden.into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn validation_failure_carries_field_level_reasons() {
        let err: AppError = ValidationError::TooShort("password".to_string(), 8).into();
        let (status, body) = err.to_response("test");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let reasons = body.errors.expect("validation reasons missing");
        assert_eq!(reasons, vec!["password is too short (minimum 8 characters)"]);
    }

    #[test]
    fn duplicate_key_maps_to_conflict() {
        let err: AppError =
            DatabaseError::UniqueConstraintViolation("email".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn error_context_carries_operation() {
        let ctx = ErrorContext::new("user_login");
        assert_eq!(ctx.operation, "user_login");
        assert!(!ctx.request_id.is_empty());
    }
}
