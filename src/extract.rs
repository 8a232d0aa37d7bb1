//! Pulls the bootstrap config object out of a hosted world page.
//!
//! The hosted page assigns an object literal inside its first inline script,
//! e.g. `window.__DATA__ = {...};`. We take the widest `{ ... }` span of that
//! script and parse it as JSON. This is a heuristic, not a parser:
//!
//! - only the first `<script` tag is looked at, even if it holds no object;
//! - a `}` that appears after the real terminator (a later statement, or a
//!   string containing `}`) widens the span and usually makes parsing fail;
//! - a `</script>` inside a string literal ends the script early.
//!
//! Behavior is kept compatible with the current page format on purpose.

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("No <script> tag found in remote content")]
    MissingScript,

    #[error("No JSON object braces found in script content")]
    MissingBraces,

    #[error("Failed to parse JSON extracted from script content: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Contents of the first `<script ...>...</script>` element, trimmed.
pub fn extract_first_script(html: &str) -> Option<&str> {
    let open = html.find("<script")?;
    let tag_end = open + html[open..].find('>')?;
    let body_start = tag_end + 1;
    let close = body_start + html[body_start..].find("</script>")?;
    Some(html[body_start..close].trim())
}

/// Substring from the first `{` to the last `}`, inclusive.
pub fn extract_json_between_braces(content: &str) -> Option<&str> {
    let first = content.find('{')?;
    let last = content.rfind('}')?;
    if last <= first {
        return None;
    }
    Some(&content[first..=last])
}

/// Runs the full script → braces → JSON chain on a fetched page.
pub fn extract_page_config(html: &str) -> Result<Value, ExtractionError> {
    let script = extract_first_script(html).ok_or(ExtractionError::MissingScript)?;
    let segment = extract_json_between_braces(script).ok_or(ExtractionError::MissingBraces)?;
    Ok(serde_json::from_str(segment)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_braces_single_object() {
        let content = r#"window.__DATA__ = {"a":{"b":1}};"#;
        assert_eq!(extract_json_between_braces(content), Some(r#"{"a":{"b":1}}"#));
    }

    #[test]
    fn test_braces_missing() {
        assert_eq!(extract_json_between_braces("no object here"), None);
        assert_eq!(extract_json_between_braces("only open {"), None);
        assert_eq!(extract_json_between_braces("} reversed {"), None);
    }

    #[test]
    fn test_first_script_trimmed() {
        let html = "<html><head><script type=\"module\">\n  run()  \n</script></head></html>";
        assert_eq!(extract_first_script(html), Some("run()"));
    }

    #[test]
    fn test_first_script_only_first() {
        let html = "<script>first</script><script>second</script>";
        assert_eq!(extract_first_script(html), Some("first"));
    }

    #[test]
    fn test_first_script_missing() {
        assert_eq!(extract_first_script("<html>No script here</html>"), None);
        assert_eq!(extract_first_script("<script>never closed"), None);
    }

    #[test]
    fn test_page_config() {
        let html = "<!doctype html><html><head><script>window.__DATA__ = {\n  \"answer\": 42, \"nested\": { \"x\": 1 }\n}// trailing stuff</script><script>ignored()</script></head></html>";
        let config = extract_page_config(html).unwrap();
        assert_eq!(config, json!({"answer": 42, "nested": {"x": 1}}));
    }

    #[test]
    fn test_page_config_errors() {
        assert!(matches!(
            extract_page_config("<html></html>"),
            Err(ExtractionError::MissingScript)
        ));
        assert!(matches!(
            extract_page_config("<script>not json at all</script>"),
            Err(ExtractionError::MissingBraces)
        ));
        assert!(matches!(
            extract_page_config("<script>x = {broken: }</script>"),
            Err(ExtractionError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_known_limitation_trailing_brace() {
        // A later statement containing `}` widens the span past the object.
        let html = r#"<script>a = {"k":1}; f = function() {}</script>"#;
        assert!(matches!(
            extract_page_config(html),
            Err(ExtractionError::InvalidJson(_))
        ));
    }
}
