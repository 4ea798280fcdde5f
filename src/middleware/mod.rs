/// Middleware module
///
/// Request-chain components, outermost first:
/// HTTPS enforcement → rate limiting → CSRF verification.

mod csrf_middleware;
mod https_enforcer;
mod rate_limit;

pub use csrf_middleware::CsrfMiddleware;
pub use https_enforcer::{HttpsEnforcer, HttpsMode, HSTS_VALUE};
pub use rate_limit::RateLimitMiddleware;

use actix_web::dev::ServiceRequest;

/// Client key for per-client state: the peer IP, or the forwarded client IP
/// when running behind a trusted proxy
pub fn client_identifier(req: &ServiceRequest, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = req.connection_info().realip_remote_addr() {
            return strip_port(ip).to_string();
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Exact match, or prefix match when the pattern ends in `*`
pub fn path_matches(path: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => path.starts_with(prefix),
        None => path == pattern,
    }
}

pub fn path_in(path: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| path_matches(path, pattern))
}

fn strip_port(addr: &str) -> &str {
    // [v6]:port
    if let Some(rest) = addr.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    // v4:port; a bare v6 address has more than one colon
    match addr.rsplit_once(':') {
        Some((host, _)) if !host.contains(':') => host,
        _ => addr,
    }
}
