/// Security event audit trail
///
/// Rejections caused by hostile input (forged requests, traversal, SSRF, unsafe
/// links, plain-HTTP access to sensitive paths) are logged as `SecurityEvent`s
/// carrying `security_event = true`, so monitoring can split them from ordinary
/// validation failures. Every free-text field goes through the log sanitizer.

use actix_web::dev::ServiceRequest;
use actix_web::HttpRequest;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::log_sanitizer::sanitize;

// RFC 3339 rendering without enabling chrono's serde feature
mod datetime_format {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub fn serialize<S>(dt: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ser.serialize_str(&dt.to_rfc3339())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEventKind {
    CsrfValidationFailed,
    PathTraversalDetected,
    SsrfBlocked,
    UnsafeUrlRejected,
    InsecureTransport,
}

impl fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SecurityEventKind::CsrfValidationFailed => "CSRF_VALIDATION_FAILED",
            SecurityEventKind::PathTraversalDetected => "PATH_TRAVERSAL_DETECTED",
            SecurityEventKind::SsrfBlocked => "SSRF_BLOCKED",
            SecurityEventKind::UnsafeUrlRejected => "UNSAFE_URL_REJECTED",
            SecurityEventKind::InsecureTransport => "INSECURE_TRANSPORT",
        };
        f.write_str(name)
    }
}

/// One audit entry
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    pub event_id: String,
    #[serde(with = "datetime_format")]
    pub timestamp: DateTime<Utc>,
    pub kind: SecurityEventKind,
    pub client_ip: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub detail: String,
}

impl SecurityEvent {
    pub fn new(kind: SecurityEventKind, detail: impl fmt::Display) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            client_ip: None,
            method: None,
            path: None,
            detail: sanitize(detail),
        }
    }

    pub fn with_client_ip(mut self, ip: impl fmt::Display) -> Self {
        self.client_ip = Some(sanitize(ip));
        self
    }

    pub fn with_request(mut self, req: &HttpRequest) -> Self {
        self.method = Some(req.method().to_string());
        self.path = Some(sanitize(req.path()));
        if let Some(addr) = req.peer_addr() {
            self.client_ip = Some(addr.ip().to_string());
        }
        self
    }

    pub fn with_service_request(self, req: &ServiceRequest) -> Self {
        self.with_request(req.request())
    }

    /// Emits the event at WARN
    pub fn record(&self) {
        tracing::warn!(
            security_event = true,
            event_id = %self.event_id,
            kind = %self.kind,
            client_ip = self.client_ip.as_deref().unwrap_or("-"),
            method = self.method.as_deref().unwrap_or("-"),
            path = self.path.as_deref().unwrap_or("-"),
            detail = %self.detail,
            "Security event"
        );
    }
}
