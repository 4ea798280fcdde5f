/// Error handling module
///
/// This module provides the unified error type for the request pipeline.
/// It covers:
/// 1. Domain-specific error types (validation, outbound URL checks)
/// 2. The application error type used for control flow
/// 3. HTTP response mapping with stable, machine-readable codes
/// 4. Structured logging that separates expected outcomes from security events

use actix_web::{error::ResponseError, http::header, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

pub use crate::url_validator::UrlValidationError;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for request fields
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooLong(String, usize),
    InvalidFormat(String),
    SuspiciousContent(String),
    MalformedBody(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains suspicious content", field)
            }
            ValidationError::MalformedBody(msg) => write!(f, "Malformed request body: {}", msg),
        }
    }
}

impl StdError for ValidationError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    RateLimitExceeded { retry_after_secs: u64 },
    CsrfValidationFailed,
    PathTraversalDetected,
    SsrfBlocked(UrlValidationError),
    InvalidUrl,
    SessionRequired,
    PayloadTooLarge,
    NotFound,
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::RateLimitExceeded { retry_after_secs } => {
                write!(f, "Rate limit exceeded, retry after {}s", retry_after_secs)
            }
            AppError::CsrfValidationFailed => write!(f, "CSRF token validation failed"),
            AppError::PathTraversalDetected => write!(f, "Path traversal detected"),
            AppError::SsrfBlocked(e) => write!(f, "Outbound URL blocked: {}", e),
            AppError::InvalidUrl => write!(f, "URL rejected"),
            AppError::SessionRequired => write!(f, "Session required"),
            AppError::PayloadTooLarge => write!(f, "Payload too large"),
            AppError::NotFound => write!(f, "Not found"),
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

impl From<UrlValidationError> for AppError {
    fn from(err: UrlValidationError) -> Self {
        AppError::SsrfBlocked(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound,
            _ => AppError::Internal(err.to_string()),
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error body returned to clients. Never carries internal detail.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for correlating with server logs
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Stable code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when the error occurred
    pub timestamp: String,
    /// Seconds until a rate-limited client may retry
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }
}

/// Converts errors to HTTP responses with matching log output
pub trait ErrorHandler {
    fn error_response(&self, error_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, error_id: &str);
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            AppError::CsrfValidationFailed => "CSRF_VALIDATION_FAILED",
            AppError::PathTraversalDetected => "PATH_TRAVERSAL_DETECTED",
            AppError::SsrfBlocked(_) => "SSRF_BLOCKED",
            AppError::InvalidUrl => "INVALID_URL",
            AppError::SessionRequired => "SESSION_REQUIRED",
            AppError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            AppError::NotFound => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Security events are reported separately from ordinary client mistakes
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            AppError::CsrfValidationFailed
                | AppError::PathTraversalDetected
                | AppError::SsrfBlocked(_)
                | AppError::InvalidUrl
        )
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::RateLimitExceeded { .. } => {
                "Too many requests, please try again later".to_string()
            }
            AppError::CsrfValidationFailed => "Invalid or missing CSRF token".to_string(),
            AppError::PathTraversalDetected => "Invalid file path".to_string(),
            AppError::SsrfBlocked(_) => "URL is not allowed".to_string(),
            AppError::InvalidUrl => "Invalid or unsafe URL".to_string(),
            AppError::SessionRequired => "A session is required".to_string(),
            AppError::PayloadTooLarge => "Request body too large".to_string(),
            AppError::NotFound => "Resource not found".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, error_id: &str) -> (StatusCode, ErrorResponse) {
        let status = ResponseError::status_code(self);
        let mut body = ErrorResponse::new(
            error_id.to_string(),
            self.public_message(),
            self.code().to_string(),
            status.as_u16(),
        );

        if let AppError::RateLimitExceeded { retry_after_secs } = self {
            body = body.with_retry_after(*retry_after_secs);
        }

        (status, body)
    }

    fn log_error(&self, error_id: &str) {
        match self {
            // Expected outcome, not an error
            AppError::RateLimitExceeded { retry_after_secs } => {
                tracing::debug!(
                    error_id = error_id,
                    retry_after = retry_after_secs,
                    "Rate limit response"
                );
            }
            e if e.is_security_event() => {
                tracing::warn!(
                    error_id = error_id,
                    security_event = true,
                    code = e.code(),
                    error = %crate::log_sanitizer::Sanitized(e),
                    "Request rejected"
                );
            }
            AppError::Internal(msg) => {
                tracing::error!(
                    error_id = error_id,
                    error = %crate::log_sanitizer::Sanitized(msg),
                    "Internal error"
                );
            }
            e => {
                tracing::info!(
                    error_id = error_id,
                    code = e.code(),
                    error = %crate::log_sanitizer::Sanitized(e),
                    "Client error"
                );
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&error_id);

        let (status, body) = <Self as ErrorHandler>::error_response(self, &error_id);

        let mut response = HttpResponse::build(status);
        if let AppError::RateLimitExceeded { retry_after_secs } = self {
            response.insert_header((header::RETRY_AFTER, retry_after_secs.to_string()));
        }
        response.json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::CsrfValidationFailed => StatusCode::FORBIDDEN,
            AppError::PathTraversalDetected => StatusCode::BAD_REQUEST,
            AppError::SsrfBlocked(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidUrl => StatusCode::BAD_REQUEST,
            AppError::SessionRequired => StatusCode::UNAUTHORIZED,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("content".to_string());
        assert_eq!(err.to_string(), "content is empty");
    }

    #[test]
    fn test_codes_and_statuses() {
        let cases = vec![
            (AppError::RateLimitExceeded { retry_after_secs: 5 }, 429, "RATE_LIMIT_EXCEEDED"),
            (AppError::CsrfValidationFailed, 403, "CSRF_VALIDATION_FAILED"),
            (AppError::PathTraversalDetected, 400, "PATH_TRAVERSAL_DETECTED"),
            (
                AppError::SsrfBlocked(UrlValidationError::MissingHost),
                400,
                "SSRF_BLOCKED",
            ),
            (AppError::SessionRequired, 401, "SESSION_REQUIRED"),
            (AppError::Internal("db".to_string()), 500, "INTERNAL_ERROR"),
        ];

        for (err, status, code) in cases {
            assert_eq!(ResponseError::status_code(&err).as_u16(), status);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_rate_limit_body_carries_retry_after() {
        let err = AppError::RateLimitExceeded { retry_after_secs: 57 };
        let (status, body) = <AppError as ErrorHandler>::error_response(&err, "id-1");

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["retryAfter"], 57);
        assert_eq!(json["code"], "RATE_LIMIT_EXCEEDED");
        assert!(json.get("message").is_some());
    }

    #[test]
    fn test_internal_detail_not_exposed() {
        let err = AppError::Internal("connection string postgres://secret".to_string());
        let (_, body) = <AppError as ErrorHandler>::error_response(&err, "id-2");

        assert_eq!(body.message, "Internal server error");
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("retryAfter").is_none());
    }

    #[test]
    fn test_security_event_classification() {
        assert!(AppError::CsrfValidationFailed.is_security_event());
        assert!(AppError::PathTraversalDetected.is_security_event());
        assert!(!AppError::RateLimitExceeded { retry_after_secs: 1 }.is_security_event());
        assert!(!AppError::Validation(ValidationError::EmptyField("x".into())).is_security_event());
    }

    #[test]
    fn test_io_not_found_maps_to_404() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn test_rate_limit_response_has_retry_after_header() {
        let err = AppError::RateLimitExceeded { retry_after_secs: 12 };
        let response = ResponseError::error_response(&err);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            "12"
        );
    }
}
