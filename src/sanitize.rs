//! # Stage: Sanitizer
//!
//! ## Responsibility
//! Make externally sourced strings safe for interpolation into markup.
//! Two primitives cover every case: [`escape_html`] for text and attribute
//! values, [`sanitize_url`] for anything placed in `href`/`src`.
//!
//! ## Guarantees
//! - Escaped output never contains a raw `<`, `>`, `"` or `'`
//! - Unescaping the output yields exactly the input
//! - `javascript:` and `data:` URLs (any case, surrounding whitespace
//!   ignored) are replaced with an empty string
//!
//! ## NOT Responsible For
//! - Validating that a URL is reachable or well-formed
//! - Markup that the application itself authors (icons, layout)

/// Escape `text` so it renders inert inside element content or a quoted
/// attribute value.
///
/// # Panics
///
/// This function never panics.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Guard a URL before it is placed into an `href` or `src` attribute.
///
/// Returns an empty string for script and inline-data schemes, otherwise the
/// escaped, trimmed URL.
///
/// # Panics
///
/// This function never panics.
pub fn sanitize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("data:") {
        return String::new();
    }
    escape_html(trimmed)
}

#[cfg(test)]
pub(crate) fn unescape_html(markup: &str) -> String {
    markup
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html_neutralises_script_tag() {
        let out = escape_html("<script>alert(\"x\")</script>");
        assert!(!out.contains("<script>"));
        assert!(!out.contains('<'));
        assert!(!out.contains('>'));
        assert!(!out.contains('"'));
        assert_eq!(out, "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;");
    }

    #[test]
    fn test_escape_html_round_trips() {
        let samples = [
            "",
            "plain text",
            "Tom & Jerry's \"show\" <b>bold</b>",
            "&amp; already escaped",
            "unicode 🚀 — ünïcödé",
            "<<>>&&\"\"''",
        ];
        for s in samples {
            assert_eq!(unescape_html(&escape_html(s)), s, "round trip failed for {s:?}");
        }
    }

    #[test]
    fn test_sanitize_url_rejects_javascript_any_case() {
        assert_eq!(sanitize_url("javascript:alert(1)"), "");
        assert_eq!(sanitize_url("JavaScript:alert(1)"), "");
        assert_eq!(sanitize_url("  JAVASCRIPT:void(0)  "), "");
    }

    #[test]
    fn test_sanitize_url_rejects_data_scheme() {
        assert_eq!(sanitize_url("data:text/html;base64,PHNjcmlwdD4="), "");
        assert_eq!(sanitize_url("\tDaTa:image/png;base64,AAAA"), "");
    }

    #[test]
    fn test_sanitize_url_passes_https_escaped() {
        assert_eq!(sanitize_url("https://example.com/x"), "https://example.com/x");
        assert_eq!(
            sanitize_url(" https://example.com/?a=1&b=\"2\" "),
            "https://example.com/?a=1&amp;b=&quot;2&quot;"
        );
    }

    #[test]
    fn test_sanitize_url_empty_input_is_empty() {
        assert_eq!(sanitize_url(""), "");
        assert_eq!(sanitize_url("   "), "");
    }
}
