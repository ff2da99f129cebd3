//! Error handling for Quicktext
//!
//! This module provides the error types used across the expansion engine, the
//! built-in resolvers and the CLI. The error system follows two rules:
//! 1. **Strongly-typed errors** ([`QuicktextError`]) for failures whose kind changes
//!    behavior (script failures carry a line number, host failures are reported
//!    through the alert surface)
//! 2. **User-friendly reports** ([`ErrorContext`]) for the command line
//!
//! # Propagation Policy
//!
//! Resolver failures never abort an expansion. They are caught at the dispatch
//! boundary in [`crate::engine::ExpansionSession::dispatch`], reported to the user
//! and replaced by empty (or debug) text. Only failures that escape the dispatch
//! boundary, such as a broken alert surface, surface as [`QuicktextError::Expansion`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use quicktext::core::{QuicktextError, user_friendly_error};
//!
//! let error = anyhow::Error::new(QuicktextError::ScriptNotFound {
//!     name: "signature".to_string(),
//! });
//! let ctx = user_friendly_error(error);
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for Quicktext operations.
#[derive(Error, Debug)]
pub enum QuicktextError {
    /// The compose host could not be reached at all
    #[error("Compose host is not available: {reason}")]
    HostUnavailable {
        /// Why the host could not be reached
        reason: String,
    },

    /// A call into the compose host failed
    #[error("Host operation '{operation}' failed: {reason}")]
    HostCall {
        /// The host operation that failed (e.g. "list attachments")
        operation: String,
        /// Underlying failure description
        reason: String,
    },

    /// A `[[SCRIPT=name]]` directive referenced an unknown script
    #[error("Script '{name}' was not found in the template library")]
    ScriptNotFound {
        /// Requested script name
        name: String,
    },

    /// A user script exited unsuccessfully
    #[error("Script '{script}' failed at line {line}: {message}")]
    ScriptFailed {
        /// Name of the script
        script: String,
        /// Best-effort 1-based line number inside the script body (0 when unknown)
        line: usize,
        /// The script line the failure points at, if any
        source_line: Option<String>,
        /// Interpreter diagnostic
        message: String,
    },

    /// An HTTP request issued by a `[[URL=...]]` directive failed
    #[error("Request to {url} failed: {reason}")]
    UrlRequest {
        /// Target URL
        url: String,
        /// Failure description
        reason: String,
    },

    /// A file referenced by `[[FILE=...]]` or `[[IMAGE=...]]` could not be read
    #[error("Failed to read file '{path}': {reason}")]
    FileRead {
        /// Path as written in the directive
        path: String,
        /// Failure description
        reason: String,
    },

    /// The durable key-value store failed
    #[error("Store operation '{operation}' failed: {reason}")]
    Store {
        /// The store operation (get, set, update)
        operation: String,
        /// Failure description
        reason: String,
    },

    /// A nested template lookup named an unknown group or text
    #[error("Template '{name}' not found in group '{group}'")]
    TemplateNotFound {
        /// Group name
        group: String,
        /// Text name
        name: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Whole-expansion failure that escaped the dispatch boundary
    #[error("Expansion failed: {reason}")]
    Expansion {
        /// Failure description
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl QuicktextError {
    /// Build a [`QuicktextError::HostCall`] from an operation name and any displayable reason.
    pub fn host_call(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::HostCall {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`QuicktextError::Store`] from an operation name and any displayable reason.
    pub fn store(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Store {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Message shown to the user through the alert surface.
    ///
    /// Script failures are rendered on several lines: the script name, the
    /// interpreter message and the offending line when it could be located.
    #[must_use]
    pub fn alert_message(&self) -> String {
        match self {
            Self::ScriptFailed {
                script,
                line,
                source_line,
                message,
            } => {
                let mut text = format!("Error in script {script}\n{message}");
                if *line > 0 {
                    text.push_str(&format!(
                        "\nLine {line}: {}",
                        source_line.as_deref().unwrap_or_default()
                    ));
                }
                text
            }
            other => other.to_string(),
        }
    }
}

/// Error wrapper that adds a suggestion and details for CLI display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: QuicktextError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: QuicktextError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
///
/// Typed [`QuicktextError`]s anywhere in the error chain are recognized first,
/// followed by IO and TOML errors. Everything else is wrapped as
/// [`QuicktextError::Other`] keeping the full context chain in the message.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(qt_error) = cause.downcast_ref::<QuicktextError>() {
            return create_error_context(qt_error, &error);
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(QuicktextError::Other {
                    message: format!("{error:#}"),
                })
                .with_suggestion("Check that the file exists and the path is correct");
            }
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(QuicktextError::Other {
                    message: format!("{error:#}"),
                })
                .with_suggestion("Check file permissions and ownership");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(QuicktextError::Config {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax: quotes, brackets and table headers");
    }

    ErrorContext::new(QuicktextError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: &QuicktextError, whole: &anyhow::Error) -> ErrorContext {
    let base = ErrorContext::new(QuicktextError::Other {
        message: format!("{whole:#}"),
    });
    match error {
        QuicktextError::ScriptNotFound {
            ..
        } => base.with_suggestion("Add the script under [[scripts]] in the template library"),
        QuicktextError::TemplateNotFound {
            ..
        } => base.with_suggestion(
            "Check the group and text names; lookups are case-sensitive",
        ),
        QuicktextError::Config {
            ..
        } => base.with_suggestion("Run 'quicktext config init' to create a starter config"),
        QuicktextError::Store {
            ..
        } => base
            .with_suggestion("Check that the store file is writable")
            .with_details("The store keeps the running COUNTER value between expansions"),
        QuicktextError::HostUnavailable {
            ..
        } => base.with_suggestion("Pass a compose context with --context"),
        _ => base,
    }
}
