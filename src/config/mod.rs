//! Configuration management for Quicktext.
//!
//! - `global` - user-wide settings (`config.toml`): debug output, date formats,
//!   request and script settings, library and store locations
//! - `templates` - the template library of grouped texts and scripts
//!
//! Both files are TOML. Neither is required: a missing configuration yields
//! defaults and a missing library is empty.

mod global;
mod templates;

pub use global::{CONFIG_PATH_ENV, DateFormats, GlobalConfig, ScriptConfig, UrlConfig};
pub use templates::{Script, Template, TemplateGroup, TemplateKind, TemplateLibrary};
