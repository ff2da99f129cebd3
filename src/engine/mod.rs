//! The directive expansion engine.
//!
//! - [`tag`] - the fixed set of recognized directive tags
//! - [`tokenizer`] - finds `[[TAG=a|b]]` occurrences in text
//! - [`cache`] - per-session memoization of resolver data
//! - [`registry`] - the [`Resolver`] trait and the tag → resolver mapping
//! - [`session`] - [`ExpansionSession`] and the fixed-point expansion loop
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quicktext::config::GlobalConfig;
//! use quicktext::engine::{ExpansionSession, ResolverRegistry};
//! use quicktext::host::HostServices;
//!
//! # async fn example(host: HostServices) -> anyhow::Result<()> {
//! let config = GlobalConfig::default();
//! let registry = Arc::new(ResolverRegistry::standard(&config));
//! let mut session = ExpansionSession::new(registry, host);
//! let text = session.parse("Dear [[TO=firstname]], see [[FILE=~/notes.txt]]").await?;
//! session.insert_body(&text, false).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod registry;
pub mod session;
pub mod tag;
pub mod tokenizer;

pub use cache::{CacheKey, CacheScope, CachedValue, SessionCache};
pub use registry::{Resolver, ResolverEntry, ResolverRegistry};
pub use session::{Expansion, ExpansionSession, MAX_PASSES};
pub use tag::{TagKind, UnknownTag};
pub use tokenizer::{Directive, tokenize};
