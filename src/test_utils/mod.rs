//! Test utilities for Quicktext
//!
//! This module provides in-memory host collaborators and a session builder so
//! resolver and engine tests can run without a terminal, a mail client or a
//! config directory.
//!
//! # Example
//!
//! ```rust,no_run
//! use quicktext::host::ComposeDetails;
//! use quicktext::test_utils::TestSession;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut test = TestSession::new(ComposeDetails {
//!     subject: "Engines".into(),
//!     ..Default::default()
//! });
//! test.context.clipboard = "copied".into();
//! let prompter = test.prompter();
//!
//! let mut session = test.build();
//! assert_eq!(session.parse("[[SUBJECT]]: [[CLIPBOARD]]").await?, "Engines: copied");
//! assert!(prompter.alerts().is_empty());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod host;

pub use builder::TestSession;
pub use host::{CountingResolver, RecordingPrompter, RecordingSink, memory_host};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`. Without either, tests run
/// without a subscriber.
///
/// ```bash
/// RUST_LOG=quicktext=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
