/// XSS protection module - stripping sanitizer for content that is later rendered as HTML
///
/// Where `input_sanitizer` escapes (safe for plain-text echo), this module removes:
/// script blocks, `on*=` event-handler attributes and dangerous URI schemes. Call
/// sites that render raw HTML need this guarantee; escaping alone is not enough
/// for them, and stripping alone is not enough for plain-text echo. Keep both.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::input_sanitizer::sanitize_text;

/// Nesting deeper than this is treated as hostile rather than stripped further
const MAX_STRIP_PASSES: usize = 16;

lazy_static! {
    static ref SCRIPT_BLOCK: Regex = Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap();
    // Unpaired opening/closing tags left over after block removal
    static ref SCRIPT_TAG: Regex = Regex::new(r"(?i)</?script\b[^>]*>?").unwrap();
    // Only inside a tag; a quote closing the previous value counts as a separator
    static ref EVENT_HANDLER: Regex = Regex::new(
        r#"(?i)(<[^>]*?)(?:[\s/]+|(["']))on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]*)"#
    ).unwrap();
    static ref JAVASCRIPT_SCHEME: Regex = Regex::new(
        r"(?i)j\s*a\s*v\s*a\s*s\s*c\s*r\s*i\s*p\s*t\s*:"
    ).unwrap();
    static ref VBSCRIPT_SCHEME: Regex = Regex::new(r"(?i)vbscript\s*:").unwrap();
    static ref DATA_HTML_SCHEME: Regex = Regex::new(r"(?i)data\s*:\s*text/html").unwrap();
}

/// HTML escaping for element content and quoted or unquoted attribute values.
///
/// Same entity set as `input_sanitizer::sanitize_text`, plus `` ` `` and `=`.
pub fn escape_html(input: &str) -> String {
    let escaped = sanitize_text(input);
    let mut out = String::with_capacity(escaped.len());

    for c in escaped.chars() {
        match c {
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            c => out.push(c),
        }
    }

    out
}

/// Strips script blocks, event handlers and dangerous URI prefixes.
///
/// Runs to a fixpoint so that fragments reassembled by one removal
/// (`<scr<script></script>ipt>`) are caught too; the result is idempotent.
/// Input still changing after `MAX_STRIP_PASSES` is escaped instead, colons
/// included, so no tag or scheme survives.
pub fn sanitize_input(input: &str) -> String {
    let mut current = input.to_string();

    for _ in 0..MAX_STRIP_PASSES {
        let next = strip_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }

    tracing::debug!(
        passes = MAX_STRIP_PASSES,
        "Markup nesting too deep, escaping instead of stripping"
    );
    escape_html(&current).replace(':', "&#x3A;")
}

fn strip_once(input: &str) -> String {
    let out = SCRIPT_BLOCK.replace_all(input, "");
    let out = SCRIPT_TAG.replace_all(&out, "");
    let out = EVENT_HANDLER.replace_all(&out, "${1}${2}");
    let out = JAVASCRIPT_SCHEME.replace_all(&out, "");
    let out = VBSCRIPT_SCHEME.replace_all(&out, "");
    let out = DATA_HTML_SCHEME.replace_all(&out, "");
    out.into_owned()
}

/// Applies `sanitize_input` to every string in a JSON value, arrays included
pub fn sanitize_object(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_input(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_object).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| (key.clone(), sanitize_object(inner)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Returns a normalized link for an `href`/`src`, or `""` when it is not http, https or mailto
pub fn sanitize_url(input: &str) -> String {
    match Url::parse(input.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https" | "mailto") => url.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_block_removed() {
        assert_eq!(sanitize_input("<script>evil()</script>hello"), "hello");
        assert_eq!(
            sanitize_input("a<SCRIPT type=\"text/javascript\">\nx()\n</ScRiPt >b"),
            "ab"
        );
    }

    #[test]
    fn test_script_removal_is_non_greedy() {
        assert_eq!(
            sanitize_input("<script>a()</script>keep<script>b()</script>"),
            "keep"
        );
    }

    #[test]
    fn test_reassembled_script_is_caught() {
        let clean = sanitize_input("<scr<script></script>ipt>alert(1)</script>");
        assert!(!clean.to_lowercase().contains("<script"));
    }

    #[test]
    fn test_event_handler_quoted_removed() {
        let clean = sanitize_input(r#"<img src=x onerror="alert(1)">"#);
        assert!(!clean.contains("onerror"));
        assert_eq!(clean, "<img src=x>");
    }

    #[test]
    fn test_event_handler_unquoted_removed() {
        assert_eq!(sanitize_input("<img src=x onerror=alert(1)>"), "<img src=x>");
        assert_eq!(sanitize_input("<svg/onload=alert(1)>"), "<svg>");
        assert_eq!(
            sanitize_input("<div ONMOUSEOVER='steal()'>hi</div>"),
            "<div>hi</div>"
        );
    }

    #[test]
    fn test_event_handler_after_quoted_value_removed() {
        let clean = sanitize_input(r#"<img src="x"onerror="alert(1)">"#);
        assert!(!clean.to_lowercase().contains("onerror"));
        assert_eq!(clean, r#"<img src="x">"#);

        assert_eq!(
            sanitize_input("<img src='x'onerror=alert(1)>"),
            "<img src='x'>"
        );
    }

    #[test]
    fn test_every_handler_in_a_tag_removed() {
        assert_eq!(sanitize_input("<img onerror=a onload=b>"), "<img>");
        assert_eq!(
            sanitize_input(r#"<a href="/" onclick="x()" onfocus='y()'>go</a>"#),
            r#"<a href="/">go</a>"#
        );
    }

    #[test]
    fn test_prose_outside_tags_untouched() {
        assert_eq!(sanitize_input("status online=yes"), "status online=yes");
        assert_eq!(
            sanitize_input("<p>ready</p> power on=1, one=2"),
            "<p>ready</p> power on=1, one=2"
        );
    }

    #[test]
    fn test_deep_nesting_is_escaped() {
        // each pass unwraps one layer: javajavascript:script: -> javascript:
        let mut scheme = String::from("javascript:");
        for _ in 0..40 {
            scheme = format!("java{}script:", scheme);
        }

        for raw in [scheme.clone(), format!("<a href=\"{}alert(1)\">x</a>", scheme)] {
            let clean = sanitize_input(&raw);
            assert!(!clean.to_lowercase().contains("javascript:"));
            assert!(!clean.contains('<'));
            assert_eq!(sanitize_input(&clean), clean);
        }
    }

    #[test]
    fn test_dangerous_schemes_removed() {
        assert_eq!(
            sanitize_input(r#"<a href="javascript:alert(1)">x</a>"#),
            r#"<a href="alert(1)">x</a>"#
        );
        assert_eq!(sanitize_input("JaVaScRiPt :void(0)"), "void(0)");
        assert_eq!(
            sanitize_input("data:text/html;base64,PHNjcmlwdD4="),
            ";base64,PHNjcmlwdD4="
        );
        assert_eq!(sanitize_input("javajavascript:script:x"), "x");
    }

    #[test]
    fn test_harmless_markup_preserved() {
        let input = "<p>Hello <b>world</b> <a href=\"https://example.com\">link</a></p>";
        assert_eq!(sanitize_input(input), input);
        assert_eq!(sanitize_input("I turned it on = off"), "I turned it on = off");
    }

    #[test]
    fn test_sanitize_input_is_idempotent() {
        let inputs = [
            "<script>evil()</script>hello",
            "<img src=x onerror=\"alert(1)\">",
            "<a href='javascript:x'>y</a>",
            "jav\tascript:alert(1)",
            "<scr<script>x</script>ipt>",
            "plain",
        ];
        for input in inputs {
            let once = sanitize_input(input);
            assert_eq!(sanitize_input(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_escape_html_attribute_safe() {
        assert_eq!(
            escape_html("\" onclick=`x`"),
            "&quot; onclick&#x3D;&#x60;x&#x60;"
        );
        let once = escape_html("<a href='x'>&</a>");
        assert_eq!(escape_html(&once), once);
    }

    #[test]
    fn test_sanitize_object_strips_all_strings() {
        let body = json!({
            "bio": "<script>x()</script>hi",
            "links": ["<img src=x onerror=y>", ["javascript:z"]],
            "age": 30
        });

        let clean = sanitize_object(&body);

        assert_eq!(clean["bio"], "hi");
        assert_eq!(clean["links"][0], "<img src=x>");
        assert_eq!(clean["links"][1][0], "z");
        assert_eq!(clean["age"], 30);
    }

    #[test]
    fn test_sanitize_url() {
        assert_eq!(sanitize_url("https://example.com/a b"), "https://example.com/a%20b");
        assert_eq!(sanitize_url("mailto:someone@example.com"), "mailto:someone@example.com");
        assert_eq!(sanitize_url("javascript:alert(1)"), "");
        assert_eq!(sanitize_url("data:text/html,<script>"), "");
        assert_eq!(sanitize_url("/relative"), "");
    }
}
