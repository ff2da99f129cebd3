//! Shared utilities.
//!
//! - [`fs`] - path expansion and atomic writes
//! - [`text`] - separators, display names, file sizes and other text helpers
//!   used by the resolvers

pub mod fs;
pub mod text;

pub use fs::{atomic_write, ensure_dir, expand_path};
pub use text::{
    ContentFlags, Mailbox, join_with_last, leaf_name, mime_from_extension, nice_file_size,
    parse_display_name, separator_arg, strip_html_comments, unescape_separator,
};
