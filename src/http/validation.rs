//! Input validation and sanitization for resource payloads.

use crate::http::response::ApiError;

/// Maximum length of the stored text, counted after escaping.
pub const MAX_TEXT_CHARS: usize = 50;

/// Trim, HTML-escape and length-check a `text` value.
pub fn sanitize_text(raw: &str) -> Result<String, ApiError> {
    let escaped = escape_html(raw.trim());
    let len = escaped.chars().count();
    if len == 0 || len > MAX_TEXT_CHARS {
        return Err(ApiError::Validation(format!(
            "text must be between 1 and {MAX_TEXT_CHARS} characters"
        )));
    }
    Ok(escaped)
}

/// Parse a path id. Only integers >= 1 are valid.
pub fn parse_id(raw: &str) -> Result<u64, ApiError> {
    match raw.parse::<u64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ApiError::Validation("id must be a positive integer".into())),
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_trimmed_and_escaped() {
        assert_eq!(sanitize_text("  hello  ").unwrap(), "hello");
        assert_eq!(
            sanitize_text("<b>a & 'b'</b>").unwrap(),
            "&lt;b&gt;a &amp; &#x27;b&#x27;&lt;&#x2F;b&gt;"
        );
    }

    #[test]
    fn test_text_length_bounds() {
        assert!(sanitize_text("   ").is_err());
        assert!(sanitize_text(&"x".repeat(MAX_TEXT_CHARS)).is_ok());
        assert!(sanitize_text(&"x".repeat(MAX_TEXT_CHARS + 1)).is_err());
        // escaping can push a short input over the limit
        assert!(sanitize_text(&"<".repeat(20)).is_err());
        assert_eq!(sanitize_text(&"é".repeat(MAX_TEXT_CHARS)).unwrap().chars().count(), 50);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("7").unwrap(), 7);
        for bad in ["0", "-1", "abc", "1.5", ""] {
            assert!(matches!(parse_id(bad), Err(ApiError::Validation(_))), "{bad}");
        }
    }
}
