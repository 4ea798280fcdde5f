/// Log sanitizing module - keeps attacker-controlled values from corrupting log output
/// Features:
/// 1. Control character stripping (C0, DEL and C1)
/// 2. Visible escaping of newline, carriage return and tab
/// 3. Recursive sanitizing of JSON values (keys and values)
/// 4. Sanitizing logger macros on top of `tracing`

use serde_json::{Map, Value};
use std::fmt;

/// Sanitizes any displayable value for a single log line.
///
/// `\n`, `\r` and `\t` are escaped to their two-character forms; every other
/// control character is dropped. The result never contains a raw line break,
/// and sanitizing it again is a no-op.
pub fn sanitize(value: impl fmt::Display) -> String {
    let rendered = value.to_string();
    let mut out = String::with_capacity(rendered.len());

    for c in rendered.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}

/// Sanitizes an optional value, rendering `None` as an empty string
pub fn sanitize_opt<T: fmt::Display>(value: Option<T>) -> String {
    value.map(sanitize).unwrap_or_default()
}

/// Recursively sanitizes a JSON value. Object keys are sanitized along with values.
pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        Value::Object(map) => {
            let mut clean = Map::with_capacity(map.len());
            for (key, inner) in map {
                clean.insert(sanitize(key), sanitize_value(inner));
            }
            Value::Object(clean)
        }
        other => other.clone(),
    }
}

/// Display adapter for structured tracing fields: `path = %Sanitized(&path)`
pub struct Sanitized<T>(pub T);

impl<T: fmt::Display> fmt::Display for Sanitized<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&sanitize(&self.0))
    }
}

impl<T: fmt::Display> fmt::Debug for Sanitized<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", sanitize(&self.0))
    }
}

/// Logs at INFO with the whole formatted message sanitized
#[macro_export]
macro_rules! safe_info {
    ($($arg:tt)+) => {
        ::tracing::info!("{}", $crate::log_sanitizer::sanitize(format_args!($($arg)+)))
    };
}

/// Logs at WARN with the whole formatted message sanitized
#[macro_export]
macro_rules! safe_warn {
    ($($arg:tt)+) => {
        ::tracing::warn!("{}", $crate::log_sanitizer::sanitize(format_args!($($arg)+)))
    };
}

/// Logs at ERROR with the whole formatted message sanitized
#[macro_export]
macro_rules! safe_error {
    ($($arg:tt)+) => {
        ::tracing::error!("{}", $crate::log_sanitizer::sanitize(format_args!($($arg)+)))
    };
}

/// Logs at DEBUG with the whole formatted message sanitized
#[macro_export]
macro_rules! safe_debug {
    ($($arg:tt)+) => {
        ::tracing::debug!("{}", $crate::log_sanitizer::sanitize(format_args!($($arg)+)))
    };
}
