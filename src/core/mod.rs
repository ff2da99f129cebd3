//! Core types for Quicktext
//!
//! This module holds the error types shared by the engine, the resolvers and
//! the command line.
//!
//! # Error Management
//!
//! - **Strongly-typed errors** ([`QuicktextError`]) for precise handling in code
//! - **User-friendly contexts** ([`ErrorContext`]) with actionable suggestions for CLI users
//! - [`user_friendly_error`] converts any `anyhow::Error` into a displayable report
//!
//! Every fallible operation returns `anyhow::Result`; typed errors are raised with
//! `anyhow::Error::new(QuicktextError::...)` and recovered with `downcast_ref` where
//! the kind matters.

pub mod error;

pub use error::{ErrorContext, QuicktextError, user_friendly_error};
