//! Content insertion for the command line, plus the HTML sanitizer applied
//! before rich-text insertion.

use std::io::Write;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;

use super::{Insertion, InsertionSink};

/// Marker placed in templates where the caret should end up.
pub const CURSOR_MARKER: &str = "[[CURSOR]]";

/// Remove every cursor marker from `content` and return the byte offset of the
/// first one in the cleaned text.
#[must_use]
pub fn take_cursor_marker(content: &str) -> (String, Option<usize>) {
    let caret = content.find(CURSOR_MARKER);
    (content.replace(CURSOR_MARKER, ""), caret)
}

struct SanitizePatterns {
    elements: Regex,
    handlers: Regex,
    javascript_urls: Regex,
}

fn sanitize_patterns() -> &'static SanitizePatterns {
    static PATTERNS: OnceLock<SanitizePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| SanitizePatterns {
        elements: Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>|<(script|style)\b[^>]*/>")
            .expect("element pattern is valid"),
        handlers: Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#)
            .expect("handler pattern is valid"),
        javascript_urls: Regex::new(r#"(?i)(href|src)\s*=\s*(["']?)\s*javascript:[^"'\s>]*(["']?)"#)
            .expect("javascript url pattern is valid"),
    })
}

/// Strip active content from an HTML fragment: `<script>` and `<style>`
/// elements, `on*=` event handler attributes and `javascript:` links.
///
/// ```
/// use quicktext::host::sanitize_html;
///
/// let html = r#"<p onclick="steal()">Hi</p><script>alert(1)</script>"#;
/// assert_eq!(sanitize_html(html), "<p>Hi</p>");
/// ```
#[must_use]
pub fn sanitize_html(html: &str) -> String {
    let patterns = sanitize_patterns();
    let cleaned = patterns.elements.replace_all(html, "");
    let cleaned = patterns.handlers.replace_all(&cleaned, "");
    patterns.javascript_urls.replace_all(&cleaned, "$1=$2#$3").into_owned()
}

/// Prints inserted content to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

#[async_trait]
impl InsertionSink for StdoutSink {
    async fn insert(&self, insertion: Insertion) -> Result<()> {
        let (mut content, caret) = take_cursor_marker(&insertion.content);
        if let Some(offset) = caret {
            tracing::debug!("Caret placed at byte offset {}", offset);
        }
        if insertion.extra_space {
            content.push(' ');
        }

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(content.as_bytes()).context("Failed to write to stdout")?;
        if !content.ends_with('\n') {
            stdout.write_all(b"\n").context("Failed to write to stdout")?;
        }
        stdout.flush().context("Failed to flush stdout")
    }
}
