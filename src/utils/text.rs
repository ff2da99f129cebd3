//! Text helpers shared by the resolvers.

use std::sync::OnceLock;

use regex::Regex;

/// Turn the literal escapes `\n` and `\t` in a separator argument into the
/// characters they name.
///
/// ```
/// use quicktext::utils::unescape_separator;
///
/// assert_eq!(unescape_separator(r"\n- "), "\n- ");
/// ```
#[must_use]
pub fn unescape_separator(separator: &str) -> String {
    separator.replace("\\n", "\n").replace("\\t", "\t")
}

/// The separator at `index`, unescaped, or `default` when the argument is absent.
#[must_use]
pub fn separator_arg(arguments: &[String], index: usize, default: &str) -> String {
    arguments.get(index).map_or_else(|| default.to_string(), |sep| unescape_separator(sep))
}

/// Join `items` with `separator`, using `last_separator` before the final item.
///
/// ```
/// use quicktext::utils::join_with_last;
///
/// let names = vec!["Ada".to_string(), "Grace".to_string(), "Alan".to_string()];
/// assert_eq!(join_with_last(&names, ", ", " and "), "Ada, Grace and Alan");
/// ```
#[must_use]
pub fn join_with_last(items: &[String], separator: &str, last_separator: &str) -> String {
    match items.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{}{}{}", rest.join(separator), last_separator, last),
    }
}

/// Human readable file size: bytes below 1 KiB, otherwise two decimals in the
/// largest fitting unit.
#[must_use]
pub fn nice_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} bytes");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.2} {}", UNITS[unit])
}

/// Name and address parsed from a `Display Name <address>` header value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name without surrounding quotes; empty when absent
    pub name: String,
    /// Address
    pub email: String,
}

/// Parse `"Doe, John" <john@example.com>`, `John Doe <john@example.com>` or a
/// bare address.
#[must_use]
pub fn parse_display_name(value: &str) -> Mailbox {
    let value = value.trim();
    if let (Some(open), true) = (value.rfind('<'), value.ends_with('>')) {
        let email = value[open + 1..value.len() - 1].trim().to_string();
        let name = value[..open].trim().trim_matches('"').trim().to_string();
        return Mailbox { name, email };
    }
    Mailbox {
        name: String::new(),
        email: value.to_string(),
    }
}

fn html_comment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"))
}

/// Remove every `<!-- ... -->` comment.
#[must_use]
pub fn strip_html_comments(content: &str) -> String {
    html_comment_pattern().replace_all(content, "").into_owned()
}

/// Last component of a path written with either separator.
#[must_use]
pub fn leaf_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// MIME type for an image file name, by extension.
#[must_use]
pub fn mime_from_extension(file_name: &str) -> &'static str {
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("tif" | "tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Options carried in a directive's flag argument, e.g. `force_as_text;strip_html_comments`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentFlags {
    /// Force plain-text insertion for the session
    pub force_as_text: bool,
    /// Remove HTML comments from the content
    pub strip_html_comments: bool,
}

impl ContentFlags {
    /// Read the flags from the argument at `index`, if present.
    #[must_use]
    pub fn from_arg(arguments: &[String], index: usize) -> Self {
        let flags = arguments.get(index).map(String::as_str).unwrap_or_default();
        Self {
            force_as_text: flags.contains("force_as_text"),
            strip_html_comments: flags.contains("strip_html_comments"),
        }
    }

    /// Apply content transformations.
    #[must_use]
    pub fn apply(self, content: String) -> String {
        if self.strip_html_comments {
            strip_html_comments(&content)
        } else {
            content
        }
    }
}
