//! Quicktext - template macro expansion for email composition
//!
//! Templates contain directives such as `[[TO=firstname]]`,
//! `[[DATE=long]]` or `[[TEXT=Replies|thanks]]`. Expanding a template
//! replaces every directive with data from the compose window, the address
//! book, the file system, the user or the network. Replacement text may
//! itself contain directives, so expansion repeats until the text stops
//! changing or a fixed pass ceiling is reached.
//!
//! # Architecture Overview
//!
//! ```text
//! template ──► tokenizer ──► directives ──► registry ──► resolver ──► session cache
//!     ▲                                                        │
//!     └──────────────── substituted text (next pass) ◄─────────┘
//! ```
//!
//! - The tokenizer ([`engine::tokenize`]) finds directives and never resolves anything.
//! - The registry ([`engine::ResolverRegistry`]) maps each tag to a resolver and
//!   the minimum number of arguments it needs.
//! - Resolvers ([`resolvers`]) fetch data once per session through the cache
//!   and render it per directive.
//! - The session ([`engine::ExpansionSession`]) runs the fixed-point loop and
//!   owns the cache and the collaborator handles ([`host::HostServices`]).
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line interface
//! - [`config`] - Global configuration and the template library
//! - [`core`] - Error types and CLI error reports
//! - [`engine`] - Tokenizer, cache, registry and expansion loop
//! - [`host`] - Collaborator traits (compose window, prompts, store, insertion)
//!   and their stock implementations
//! - [`resolvers`] - The built-in directive resolvers
//! - [`utils`] - Text and file helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use quicktext::config::GlobalConfig;
//! use quicktext::engine::{ExpansionSession, ResolverRegistry};
//! use quicktext::host::{
//!     ComposeContext, HostServices, MemoryStore, NonInteractivePrompter, StaticComposeHost,
//!     StdoutSink,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = Arc::new(ResolverRegistry::standard(&GlobalConfig::default()));
//! let services = HostServices {
//!     compose: Arc::new(StaticComposeHost::new(ComposeContext::default())),
//!     prompter: Arc::new(NonInteractivePrompter),
//!     store: Arc::new(MemoryStore::new()),
//!     sink: Arc::new(StdoutSink),
//! };
//!
//! let mut session = ExpansionSession::new(registry, services);
//! let text = session.parse("Today is [[DATE=long]].").await?;
//! session.insert_body(&text, false).await?;
//! # Ok(())
//! # }
//! ```

// Core functionality modules
pub mod cli;
pub mod config;
pub mod core;
pub mod engine;

// Directive resolution
pub mod host;
pub mod resolvers;

// Supporting modules
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
