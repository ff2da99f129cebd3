//! Integration test suite for Quicktext
//!
//! End-to-end tests for the expansion engine, driven through the public
//! library API, and for the `quicktext` binary, driven through `assert_cmd`.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! cargo nextest run --test integration
//! ```
//!
//! # Test Organization
//!
//! - **expansion**: Fixed-point loop, nesting, malformed input and the pass ceiling
//! - **caching**: Once-per-session memoization, persistent entries and the durable counter
//! - **failures**: Resolver failures, alerts and debug output
//! - **cli**: The command-line surface (`expand`, `text`, `tokenize`, `counter`, `config`)

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod caching;
mod cli;
mod expansion;
mod failures;
