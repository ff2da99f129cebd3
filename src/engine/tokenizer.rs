//! Directive tokenizer.
//!
//! Finds `[[TAG]]`, `[[TAG=arg1|arg2]]` and legacy `[[TAG_value]]` occurrences in
//! a template string. The tokenizer is a pure function; it never resolves anything.
//!
//! # Algorithm
//!
//! 1. Every opening marker `[[TAGNAME` (optionally `_suffix`) is located with a
//!    case-insensitive pattern, left to right.
//! 2. Candidates are processed last-first. A candidate is either closed right
//!    after its name (`]]`, no arguments) or followed by `=`, in which case the
//!    argument list is scanned with a bracket counter: the closing marker is the
//!    first `]` that drives the counter to `-1` and is followed by another `]`.
//!    A nested `[[...]]` inside an argument therefore never ends the outer scan.
//! 3. Because candidates are handled last-first, a directive nested inside a
//!    later-closing one has always been recorded before its enclosing directive.
//!    When the enclosing directive closes, the nested records are dropped again:
//!    they stay untouched in the argument text and surface in a later pass, once
//!    the enclosing directive has been substituted away.
//! 4. Occurrences are deduplicated by raw text and returned in textual order.
//!
//! Unterminated candidates are silently discarded.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use super::tag::TagKind;

/// One textual match of a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// The exact matched text including brackets; used as the substitution key.
    pub raw: String,
    /// The recognized tag.
    pub tag: TagKind,
    /// Positional arguments in order. Empty segments are kept as empty strings.
    pub arguments: Vec<String>,
    /// Byte offset of the opening `[[`.
    pub start: usize,
    /// Byte offset one past the closing `]]`.
    pub end: usize,
}

fn opening_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let names: Vec<&str> = TagKind::ALL.iter().map(|tag| tag.as_str()).collect();
        let pattern = format!(r"(?i)\[\[(({})(_[a-z]+)?)", names.join("|"));
        Regex::new(&pattern).expect("directive opening pattern is valid")
    })
}

/// An opening marker found by the pattern, before its arguments are scanned.
struct Candidate<'a> {
    start: usize,
    head_end: usize,
    tag: TagKind,
    suffix: Option<&'a str>,
}

/// Tokenize `text` into its top-level directive occurrences, in textual order.
///
/// # Examples
///
/// ```
/// use quicktext::engine::{tokenize, TagKind};
///
/// let found = tokenize("Hi [[TO=firstname]], see [[URL=http://x|[[TO=email]]]]");
/// assert_eq!(found.len(), 2);
/// assert_eq!(found[0].tag, TagKind::To);
/// assert_eq!(found[1].arguments, vec!["http://x", "[[TO=email]]"]);
/// ```
pub fn tokenize(text: &str) -> Vec<Directive> {
    let candidates = find_candidates(text);
    if candidates.is_empty() {
        return Vec::new();
    }

    // Recorded last-first: starts are strictly decreasing along the stack.
    let mut recorded: Vec<Directive> = Vec::new();
    for candidate in candidates.iter().rev() {
        let Some(directive) = close_candidate(text, candidate) else {
            tracing::trace!(
                "Discarding unterminated {} directive at offset {}",
                candidate.tag,
                candidate.start
            );
            continue;
        };

        while recorded.last().is_some_and(|inner| inner.start < directive.end) {
            if let Some(inner) = recorded.pop() {
                tracing::trace!("Deferring nested directive {} to a later pass", inner.raw);
            }
        }
        recorded.push(directive);
    }

    let mut seen = HashSet::new();
    let mut hits: Vec<Directive> =
        recorded.into_iter().filter(|directive| seen.insert(directive.raw.clone())).collect();
    hits.reverse();
    hits
}

fn find_candidates(text: &str) -> Vec<Candidate<'_>> {
    opening_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let tag = caps.get(2)?.as_str().parse::<TagKind>().ok()?;
            Some(Candidate {
                start: whole.start(),
                head_end: whole.end(),
                tag,
                suffix: caps.get(3).map(|m| &m.as_str()[1..]),
            })
        })
        .collect()
}

fn close_candidate(text: &str, candidate: &Candidate<'_>) -> Option<Directive> {
    let bytes = text.as_bytes();
    let mut arguments: Vec<String> =
        candidate.suffix.map(|suffix| suffix.to_lowercase()).into_iter().collect();
    let pos = candidate.head_end;

    if bytes.get(pos..pos + 2) == Some(b"]]".as_slice()) {
        let end = pos + 2;
        return Some(Directive {
            raw: text[candidate.start..end].to_string(),
            tag: candidate.tag,
            arguments,
            start: candidate.start,
            end,
        });
    }

    if bytes.get(pos) != Some(&b'=') {
        return None;
    }

    let body_start = pos + 1;
    let body_end = find_closing(bytes, body_start)?;
    arguments.extend(split_arguments(&text[body_start..body_end]));
    let end = body_end + 2;

    Some(Directive {
        raw: text[candidate.start..end].to_string(),
        tag: candidate.tag,
        arguments,
        start: candidate.start,
        end,
    })
}

/// Offset of the `]]` closing an argument list that starts at `from`.
fn find_closing(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth: i32 = 0;
    for pos in from..bytes.len() {
        match bytes[pos] {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == -1 && bytes.get(pos + 1) == Some(&b']') {
                    return Some(pos);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split an argument list on `|` at bracket depth zero.
fn split_arguments(body: &str) -> Vec<String> {
    let mut arguments = Vec::new();
    let mut depth: i32 = 0;
    let mut segment_start = 0;
    for (pos, byte) in body.bytes().enumerate() {
        match byte {
            b'[' => depth += 1,
            b']' => depth -= 1,
            b'|' if depth <= 0 => {
                arguments.push(body[segment_start..pos].to_string());
                segment_start = pos + 1;
            }
            _ => {}
        }
    }
    arguments.push(body[segment_start..].to_string());
    arguments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(found: &[Directive]) -> Vec<TagKind> {
        found.iter().map(|d| d.tag).collect()
    }

    #[test]
    fn test_no_directives() {
        assert!(tokenize("plain text with [brackets] and [[CURSOR]]").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_zero_argument_directive() {
        let found = tokenize("Count: [[COUNTER]].");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw, "[[COUNTER]]");
        assert_eq!(found[0].tag, TagKind::Counter);
        assert!(found[0].arguments.is_empty());
        assert_eq!((found[0].start, found[0].end), (7, 18));
    }

    #[test]
    fn test_arguments_keep_order_and_empty_segments() {
        let found = tokenize("[[TO=firstname||, ]]");
        assert_eq!(found[0].arguments, vec!["firstname", "", ", "]);
    }

    #[test]
    fn test_case_insensitive_tag() {
        let found = tokenize("[[subject]] [[Date=long]]");
        assert_eq!(tags(&found), vec![TagKind::Subject, TagKind::Date]);
        assert_eq!(found[0].raw, "[[subject]]");
    }

    #[test]
    fn test_legacy_suffix_form() {
        let found = tokenize("[[TO_Email]] and [[DATE_long=x]]");
        assert_eq!(found[0].tag, TagKind::To);
        assert_eq!(found[0].arguments, vec!["email"]);
        assert_eq!(found[0].raw, "[[TO_Email]]");
        assert_eq!(found[1].arguments, vec!["long", "x"]);
    }

    #[test]
    fn test_nested_directive_stays_in_outer_argument() {
        let found = tokenize("[[URL=http://x|[[TO=email]]]]");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag, TagKind::Url);
        assert_eq!(found[0].arguments, vec!["http://x", "[[TO=email]]"]);
        assert_eq!(found[0].raw, "[[URL=http://x|[[TO=email]]]]");
    }

    #[test]
    fn test_nested_directive_with_pipes_is_one_argument() {
        let found = tokenize("[[URL=http://x|[[TEXT=group|name]]|get]]");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].arguments, vec!["http://x", "[[TEXT=group|name]]", "get"]);
    }

    #[test]
    fn test_unterminated_directive_is_ignored() {
        assert!(tokenize("[[URL=unterminated").is_empty());
        assert!(tokenize("[[TEXT=a|b] ").is_empty());
    }

    #[test]
    fn test_unterminated_outer_leaves_inner_visible() {
        let found = tokenize("[[URL=http://x|[[TO=email]]");
        assert_eq!(found[0].raw, "[[TO=email]]");
    }

    #[test]
    fn test_unknown_or_malformed_heads_are_ignored() {
        assert!(tokenize("[[TOOL]] [[ATTACH=1]] [[DATE x]]").is_empty());
    }

    #[test]
    fn test_single_bracket_does_not_close() {
        assert!(tokenize("[[TO=a]b]]").is_empty());
    }

    #[test]
    fn test_duplicates_collapse_to_one_occurrence() {
        let found = tokenize("[[DATE]] and [[DATE]]");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw, "[[DATE]]");
        // the surviving record is the last textual instance
        assert_eq!(found[0].start, 13);
    }

    #[test]
    fn test_order_follows_last_instance() {
        let found = tokenize("[[TO=email]] [[SUBJECT]] [[TO=email]]");
        assert_eq!(tags(&found), vec![TagKind::Subject, TagKind::To]);
    }

    #[test]
    fn test_adjacent_directives() {
        let found = tokenize("[[DATE]][[TIME=seconds]][[VERSION]]");
        assert_eq!(tags(&found), vec![TagKind::Date, TagKind::Time, TagKind::Version]);
    }

    #[test]
    fn test_triple_bracket_prefix() {
        let found = tokenize("[[[SUBJECT]]");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw, "[[SUBJECT]]");
    }

    #[test]
    fn test_multibyte_text_around_directives() {
        let found = tokenize("Grüße, [[FROM=firstname]] – ✓");
        assert_eq!(found[0].raw, "[[FROM=firstname]]");
        assert_eq!(found[0].arguments, vec!["firstname"]);
    }
}
