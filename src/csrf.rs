/// CSRF token management
///
/// One live token per session:
/// - 64 random alphanumeric characters (~380 bits of entropy)
/// - Stored as a SHA-256 hash, never in plaintext
/// - Expires after the configured TTL (one hour by default)
/// - Issuing a new token replaces the previous one
/// - Compared in constant time

use actix_web::http::Method;
use actix_web::{HttpMessage, HttpRequest};
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::validators::validate_session_id;

pub const CSRF_HEADER: &str = "X-CSRF-Token";
pub const SESSION_COOKIE: &str = "session_id";
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;

const TOKEN_LENGTH: usize = 64;

/// Session identifier placed in request extensions by the upstream session layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

/// Stored token state for one session
#[derive(Debug, Clone)]
pub struct CsrfTokenRecord {
    token_hash: [u8; 32],
    expires_at: DateTime<Utc>,
}

impl CsrfTokenRecord {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub struct CsrfProtection {
    records: Mutex<HashMap<String, CsrfTokenRecord>>,
    ttl: Duration,
}

impl Default for CsrfProtection {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS))
    }
}

impl CsrfProtection {
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a fresh token for the session, invalidating any earlier one
    pub fn issue(&self, session_id: &str) -> String {
        self.issue_at(session_id, Utc::now())
    }

    pub fn issue_at(&self, session_id: &str, now: DateTime<Utc>) -> String {
        let token = generate_token();
        let record = CsrfTokenRecord {
            token_hash: hash_token(&token),
            expires_at: now + self.ttl,
        };

        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(session_id.to_string(), record);

        token
    }

    /// True only when the session holds an unexpired token equal to `token`
    pub fn verify(&self, session_id: &str, token: &str) -> bool {
        self.verify_at(session_id, token, Utc::now())
    }

    pub fn verify_at(&self, session_id: &str, token: &str, now: DateTime<Utc>) -> bool {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let expired = match records.get(session_id) {
            None => return false,
            Some(record) => record.is_expired_at(now),
        };

        if expired {
            records.remove(session_id);
            return false;
        }

        records
            .get(session_id)
            .map(|record| constant_time_eq(&record.token_hash, &hash_token(token)))
            .unwrap_or(false)
    }

    /// Drops the session's token (session end)
    pub fn revoke(&self, session_id: &str) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(session_id);
    }

    /// Removes every expired record; returns how many were dropped
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = records.len();
        records.retain(|_, record| !record.is_expired_at(now));
        before - records.len()
    }

    pub fn record_for(&self, session_id: &str) -> Option<CsrfTokenRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(session_id)
            .cloned()
    }
}

/// GET, HEAD and OPTIONS are exempt; every other method must carry a token
pub fn is_state_changing(method: &Method) -> bool {
    !(method == Method::GET || method == Method::HEAD || method == Method::OPTIONS)
}

/// Session id from the upstream session layer, falling back to the session cookie.
/// A cookie value that is not a well-formed session id counts as no session.
pub fn resolve_session_id(req: &HttpRequest) -> Option<String> {
    if let Some(SessionId(id)) = req.extensions().get::<SessionId>() {
        return Some(id.clone());
    }

    req.cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| validate_session_id(value).is_ok())
}

fn generate_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

fn hash_token(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
