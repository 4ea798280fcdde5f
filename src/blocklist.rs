/// Blocked host list shared by the inbound URL sanitizer and the outbound URL validator.
///
/// Two layers: textual patterns over the hostname, and address-class checks for
/// anything that parses as an IP. The url crate already normalizes exotic IPv4
/// spellings (`0x7f.1`, `2130706433`) into `Host::Ipv4`, so both layers see the
/// canonical address.
///
/// This is pattern matching only. A public-looking name that resolves to a
/// private address at request time is NOT caught here.

use lazy_static::lazy_static;
use regex::Regex;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::Host;

lazy_static! {
    static ref BLOCKED_HOST_PATTERNS: Vec<Regex> = vec![
        // Loopback names
        Regex::new(r"^localhost$").unwrap(),
        Regex::new(r"\.localhost$").unwrap(),
        // IPv4 loopback, "this network", RFC1918, link-local
        Regex::new(r"^127\.").unwrap(),
        Regex::new(r"^0\.").unwrap(),
        Regex::new(r"^10\.").unwrap(),
        Regex::new(r"^172\.(1[6-9]|2[0-9]|3[01])\.").unwrap(),
        Regex::new(r"^192\.168\.").unwrap(),
        Regex::new(r"^169\.254\.").unwrap(),
        // IPv6 loopback, unspecified, unique-local, link-local, v4-mapped
        Regex::new(r"^\[?::1\]?$").unwrap(),
        Regex::new(r"^\[?::\]?$").unwrap(),
        Regex::new(r"^\[?f[cd][0-9a-f]{2}:").unwrap(),
        Regex::new(r"^\[?fe[89ab][0-9a-f]:").unwrap(),
        Regex::new(r"^\[?::ffff:").unwrap(),
    ];
}

/// Returns true when a parsed URL host points at a loopback, private or link-local target
pub fn is_blocked_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => is_blocked_hostname(domain),
        Host::Ipv4(addr) => is_blocked_ip(IpAddr::V4(*addr)),
        Host::Ipv6(addr) => is_blocked_ip(IpAddr::V6(*addr)),
    }
}

/// Textual check for a raw hostname or address literal (brackets allowed for IPv6)
pub fn is_blocked_hostname(hostname: &str) -> bool {
    let normalized = hostname.trim().trim_end_matches('.').to_ascii_lowercase();

    if normalized.is_empty() {
        return true;
    }

    let unbracketed = normalized.trim_start_matches('[').trim_end_matches(']');
    if let Ok(addr) = unbracketed.parse::<IpAddr>() {
        if is_blocked_ip(addr) {
            return true;
        }
    }

    BLOCKED_HOST_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(&normalized))
}

/// Address-class check for IPv4 and IPv6
pub fn is_blocked_ip(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => is_blocked_ipv6(v6),
    }
}

fn is_blocked_ipv4(addr: Ipv4Addr) -> bool {
    let octets = addr.octets();
    addr.is_loopback()
        || addr.is_private()
        || addr.is_link_local()
        || addr.is_unspecified()
        || addr.is_broadcast()
        || octets[0] == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (octets[0] == 100 && (octets[1] & 0xc0) == 64)
}

fn is_blocked_ipv6(addr: Ipv6Addr) -> bool {
    if let Some(v4) = addr.to_ipv4_mapped() {
        return is_blocked_ipv4(v4);
    }

    let first = addr.segments()[0];
    addr.is_loopback()
        || addr.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}
