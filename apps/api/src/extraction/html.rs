//! Reduces a fetched page (or pasted text) to plain, single-spaced text.

use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid regex"));
static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Minimum normalized length worth sending to the model.
pub const MIN_CONTENT_CHARS: usize = 100;

pub fn normalize(html: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(html, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = TAG.replace_all(&text, " ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

pub fn is_substantial(text: &str) -> bool {
    text.chars().count() >= MIN_CONTENT_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scripts_styles_and_tags() {
        let html = r#"<html><head><style>body { color: red; }</style>
            <script type="text/javascript">var x = "<b>";</script></head>
            <body><h1>Senior   Engineer</h1><p>Build <em>things</em>.</p></body></html>"#;
        assert_eq!(normalize(html), "Senior Engineer Build things .");
    }

    #[test]
    fn test_script_removal_is_case_insensitive_and_multiline() {
        let html = "<SCRIPT>\nalert('hi');\n</SCRIPT>Apply now";
        assert_eq!(normalize(html), "Apply now");
    }

    #[test]
    fn test_plain_text_only_collapses_whitespace() {
        assert_eq!(normalize("  Rust\n\n\tdeveloper  "), "Rust developer");
    }

    #[test]
    fn test_substantial_threshold() {
        assert!(!is_substantial(&"a".repeat(99)));
        assert!(is_substantial(&"a".repeat(100)));
    }
}
