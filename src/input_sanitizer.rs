/// Input sanitizer module - escaping sanitizer for untrusted request data
/// Features:
/// 1. HTML escaping safe for plain-text echo (idempotent)
/// 2. Recursive escaping of JSON request bodies
/// 3. Best-effort path token stripping
/// 4. Inbound URL screening (scheme + blocked hosts)
///
/// Guarantee: output is safe to echo as plain text. It is NOT a guarantee for
/// rendering raw HTML; that is what `xss::sanitize_input` is for.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::blocklist::is_blocked_host;

lazy_static! {
    // An existing character reference; its ampersand is left alone so escaping stays idempotent
    static ref ENTITY_PREFIX: Regex = Regex::new(
        r"^&(?:[a-zA-Z][a-zA-Z0-9]{1,31}|#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6});"
    ).unwrap();
}

const PATH_SEPARATOR_PLACEHOLDER: char = '_';

/// Escapes `& < > " ' /` to entity form.
///
/// Ampersands that already start a character reference are kept, so
/// `sanitize_text(sanitize_text(s)) == sanitize_text(s)`.
pub fn sanitize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 4);

    for (idx, c) in input.char_indices() {
        match c {
            '&' if ENTITY_PREFIX.is_match(&input[idx..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            c => out.push(c),
        }
    }

    out
}

/// Escapes a JSON leaf; anything that is not a string degrades to `""`
pub fn sanitize_json_text(value: &Value) -> String {
    match value {
        Value::String(s) => sanitize_text(s),
        _ => String::new(),
    }
}

/// Escapes every string leaf of a request body.
///
/// Objects recurse to any depth. Arrays are handled one level deep: their
/// string elements are escaped and their object elements recurse, but an
/// array nested directly inside an array is passed through untouched.
/// Numbers, booleans and null are never modified. Keys are not rewritten.
pub fn sanitize_object(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_text(s)),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| (key.clone(), sanitize_object(inner)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_array_item).collect()),
        other => other.clone(),
    }
}

fn sanitize_array_item(item: &Value) -> Value {
    match item {
        Value::String(s) => Value::String(sanitize_text(s)),
        Value::Object(_) => sanitize_object(item),
        other => other.clone(),
    }
}

/// Strips traversal tokens from a user-supplied file name.
///
/// Separators become `_`, NUL bytes are dropped and `..` is removed until none
/// remain. This is a pre-filter only; `path_validator::validate_path` is the
/// containment check.
pub fn sanitize_path(input: &str) -> String {
    let mut cleaned: String = input
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| match c {
            '/' | '\\' => PATH_SEPARATOR_PLACEHOLDER,
            c => c,
        })
        .collect();

    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", "");
    }

    cleaned
}

/// Screens a user-supplied link for storage or display.
///
/// Returns `None` when the input does not parse, is not http/https, has no
/// host, or names a loopback/private/link-local host. `None` means reject.
pub fn sanitize_url(input: &str) -> Option<Url> {
    let parsed = Url::parse(input.trim()).ok()?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let blocked = match parsed.host() {
        Some(host) => is_blocked_host(&host),
        None => true,
    };
    if blocked {
        return None;
    }

    Some(parsed)
}

/// Log-safe rendering of an arbitrary value
pub fn sanitize_for_log(value: impl std::fmt::Display) -> String {
    crate::log_sanitizer::sanitize(value)
}
