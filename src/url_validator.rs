/// Outbound URL validation (SSRF defense)
///
/// Allowlist-based: a URL the server itself is about to fetch must be http/https,
/// must name an allowed domain (exactly or as a subdomain), and must never point
/// at a loopback/private/link-local host even if that host is allowlisted.
///
/// Known gap: hostnames are checked textually. An allowlisted name that
/// resolves to a private address at fetch time (DNS rebinding) is not caught.

use std::fmt;
use std::sync::RwLock;
use url::Url;

use crate::blocklist::is_blocked_host;

pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &[
    "pinata.cloud",
    "ipfs.io",
    "cloudflare-ipfs.com",
    "dweb.link",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlValidationError {
    Unparseable,
    DisallowedScheme(String),
    MissingHost,
    PrivateAddress(String),
    DomainNotAllowed(String),
}

impl fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlValidationError::Unparseable => write!(f, "URL could not be parsed"),
            UrlValidationError::DisallowedScheme(scheme) => {
                write!(f, "URL scheme '{}' is not allowed", scheme)
            }
            UrlValidationError::MissingHost => write!(f, "URL has no host"),
            UrlValidationError::PrivateAddress(host) => {
                write!(f, "URL host '{}' is a private or loopback address", host)
            }
            UrlValidationError::DomainNotAllowed(host) => {
                write!(f, "URL host '{}' is not in the allowed domain list", host)
            }
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// Allowed-domain set plus the checks that consult it.
///
/// The set is populated at configuration time; `add_allowed_domain` is an
/// administrative operation, not something request handlers call.
pub struct UrlValidator {
    allowed_domains: RwLock<Vec<String>>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_DOMAINS.iter().copied())
    }
}

impl UrlValidator {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let validator = Self {
            allowed_domains: RwLock::new(Vec::new()),
        };
        for domain in domains {
            validator.add_allowed_domain(domain.as_ref());
        }
        validator
    }

    /// Appends a domain suffix; blank entries and duplicates are ignored
    pub fn add_allowed_domain(&self, domain: &str) {
        let normalized = normalize_domain(domain);
        if normalized.is_empty() {
            return;
        }

        let mut domains = self
            .allowed_domains
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !domains.contains(&normalized) {
            tracing::info!(domain = %normalized, "Added allowed outbound domain");
            domains.push(normalized);
        }
    }

    pub fn allowed_domains(&self) -> Vec<String> {
        self.allowed_domains
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_url_safe(&self, url: &str) -> bool {
        self.validate_url(url).is_ok()
    }

    /// Fail-closed check used before any outbound fetch
    pub fn validate_url(&self, url: &str) -> Result<Url, UrlValidationError> {
        let parsed = Url::parse(url.trim()).map_err(|_| UrlValidationError::Unparseable)?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UrlValidationError::DisallowedScheme(parsed.scheme().to_string()));
        }

        let host = parsed.host().ok_or(UrlValidationError::MissingHost)?;
        let host_name = host.to_string().to_ascii_lowercase();

        // Checked before the allowlist so an allowlisted private name still fails
        if is_blocked_host(&host) {
            return Err(UrlValidationError::PrivateAddress(host_name));
        }

        if !self.is_domain_allowed(&host_name) {
            return Err(UrlValidationError::DomainNotAllowed(host_name));
        }

        Ok(parsed)
    }

    /// True when the URL parses and its host is loopback, private or link-local
    pub fn is_internal_url(&self, url: &str) -> bool {
        match Url::parse(url.trim()) {
            Ok(parsed) => parsed.host().map(|h| is_blocked_host(&h)).unwrap_or(false),
            Err(_) => false,
        }
    }

    fn is_domain_allowed(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.');
        let domains = self
            .allowed_domains
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        domains.iter().any(|domain| {
            host == domain
                || (host.len() > domain.len()
                    && host.ends_with(domain.as_str())
                    && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
        })
    }
}

fn normalize_domain(domain: &str) -> String {
    domain
        .trim()
        .trim_start_matches("*.")
        .trim_start_matches('.')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}
