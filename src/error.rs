/// Error Handling Module
///
/// Unified error handling for the session service:
/// 1. Domain-specific error types (validation, authentication, config)
/// 2. A single `AppError` that everything converts into with `?`
/// 3. HTTP response mapping with structured logging
///
/// Storage failures keep their own type (`StoreError`) and are never
/// turned into authentication failures.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::store::StoreError;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone, PartialEq, Eq)]
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
                write!(f, "{} is too long (maximum {} bytes)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

impl StdError for ValidationError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Authentication errors
///
/// `SessionTerminated` is deliberately distinct from `InvalidRefresh`:
/// the session has been torn down and the client must log in again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    EmailTaken,
    /// Bad email or bad password, never distinguished
    InvalidCredentials,
    /// Bad signature, expired, or unknown subject
    InvalidRefresh,
    /// Refresh fingerprint mismatch, lost rotation race, or no session
    SessionTerminated,
    /// Access token rejected (signature, expiry or stale epoch)
    TokenInvalid,
    MissingToken,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::EmailTaken => write!(f, "Email is already registered"),
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::InvalidRefresh => write!(f, "Invalid or expired refresh token"),
            AuthError::SessionTerminated => write!(f, "Session has been terminated"),
            AuthError::TokenInvalid => write!(f, "Invalid or expired token"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Auth(AuthError),
    /// Account store unreachable or failing; fatal, not a security signal
    Store(StoreError),
    Config(ConfigError),
    Internal(String),
}

impl AppError {
    /// The authentication error kind, if this is one
    pub fn auth_kind(&self) -> Option<AuthError> {
        match self {
            AppError::Auth(e) => Some(*e),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response body
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for correlating with logs
    pub error_id: String,
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),

            AppError::Auth(e) => {
                let code = match e {
                    AuthError::EmailTaken => "EMAIL_TAKEN",
                    AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
                    AuthError::InvalidRefresh => "INVALID_REFRESH",
                    AuthError::SessionTerminated => "SESSION_TERMINATED",
                    AuthError::TokenInvalid => "TOKEN_INVALID",
                    AuthError::MissingToken => "MISSING_TOKEN",
                };
                (auth_status(e), code, e.to_string())
            }

            // Store detail never crosses the boundary
            AppError::Store(StoreError::Unavailable(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Account store temporarily unavailable".to_string(),
            ),
            AppError::Store(StoreError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Account not found".to_string(),
            ),
            AppError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_STORE_ERROR",
                "Account store error".to_string(),
            ),

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let error_response =
            ErrorResponse::new(request_id.to_string(), message, code.to_string(), status.as_u16());

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Auth(AuthError::SessionTerminated) => {
                tracing::warn!(request_id = request_id, error = %self, "Session terminated");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Store(e) => {
                tracing::error!(request_id = request_id, error = %e, "Account store error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::EmailTaken => StatusCode::CONFLICT,
        _ => StatusCode::UNAUTHORIZED,
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(e) => auth_status(e),
            AppError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Error context for request-scoped logging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub account_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            account_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_account_id(mut self, account_id: String) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn log_error(&self, error: &AppError) {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "account_id": self.account_id,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match error {
            AppError::Validation(_) | AppError::Auth(_) => {
                tracing::warn!(error = %error, context = ?context, "Request rejected");
            }
            _ => {
                tracing::error!(error = %error, context = ?context, "Request failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("email".to_string());
        assert_eq!(err.to_string(), "email is empty");
    }

    #[test]
    fn test_app_error_conversion() {
        let app_err: AppError = AuthError::SessionTerminated.into();
        assert_eq!(app_err.auth_kind(), Some(AuthError::SessionTerminated));

        let store_err: AppError = StoreError::Unavailable("timeout".to_string()).into();
        assert_eq!(store_err.auth_kind(), None);
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(
            AppError::Auth(AuthError::EmailTaken).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Auth(AuthError::SessionTerminated).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Store(StoreError::Unavailable("down".to_string())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_session_terminated_has_distinct_code() {
        let (_, terminated) =
            ErrorHandler::error_response(&AppError::Auth(AuthError::SessionTerminated), "id");
        let (_, invalid) =
            ErrorHandler::error_response(&AppError::Auth(AuthError::InvalidRefresh), "id");

        assert_eq!(terminated.code, "SESSION_TERMINATED");
        assert_eq!(invalid.code, "INVALID_REFRESH");
    }

    #[test]
    fn test_store_detail_is_hidden() {
        let err = AppError::Store(StoreError::Backend("relation accounts missing".to_string()));
        let (status, body) = ErrorHandler::error_response(&err, "req-1");

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("relation"));
        assert_eq!(body.error_id, "req-1");
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("token_refresh");
        assert_eq!(ctx.operation, "token_refresh");
        assert!(ctx.account_id.is_none());

        let ctx = ctx.with_account_id("acc-1".to_string());
        assert_eq!(ctx.account_id, Some("acc-1".to_string()));
    }
}
