//! Built-in directive resolvers.
//!
//! | Module | Tags |
//! |--------|------|
//! | [`compose`] | `ATT`, `SUBJECT`, `SELECTION`, `HEADER` |
//! | [`contacts`] | `TO`, `FROM` |
//! | [`original`] | `ORGHEADER`, `ORGATT` |
//! | [`datetime`] | `DATE`, `TIME` |
//! | [`system`] | `COUNTER`, `VERSION`, `CLIPBOARD` |
//! | [`content`] | `TEXT`, `FILE`, `IMAGE`, `INPUT` |
//! | [`script`] | `SCRIPT` |
//! | [`url`] | `URL` |
//!
//! Argument minimums follow the directive table: tags that only read session
//! state need none, tags naming a field, file, script or URL need one, and
//! `TEXT` (group and name) and `HEADER` (field and value) need two.

pub mod compose;
pub mod contacts;
pub mod content;
pub mod datetime;
pub mod original;
pub mod script;
pub mod system;
pub mod url;

use crate::config::GlobalConfig;
use crate::engine::{ResolverRegistry, TagKind};

pub use compose::{AttResolver, HeaderResolver, SelectionResolver, SubjectResolver};
pub use contacts::{FromResolver, ToResolver};
pub use content::{FileResolver, ImageResolver, InputResolver, TextResolver};
pub use datetime::{DateResolver, TimeResolver};
pub use original::{OrgAttResolver, OrgHeaderResolver};
pub use script::ScriptResolver;
pub use system::{COUNTER_KEY, ClipboardResolver, CounterResolver, VersionResolver};
pub use url::UrlResolver;

/// Register every built-in resolver with its minimum argument count.
pub fn register_builtins(registry: &mut ResolverRegistry, config: &GlobalConfig) {
    registry
        .register(TagKind::Att, 0, AttResolver)
        .register(TagKind::Clipboard, 0, ClipboardResolver)
        .register(TagKind::Selection, 0, SelectionResolver)
        .register(TagKind::Counter, 0, CounterResolver)
        .register(TagKind::Date, 0, DateResolver)
        .register(TagKind::Subject, 0, SubjectResolver)
        .register(TagKind::Time, 0, TimeResolver)
        .register(TagKind::Version, 0, VersionResolver)
        .register(TagKind::OrgAtt, 0, OrgAttResolver)
        .register(TagKind::File, 1, FileResolver)
        .register(TagKind::Image, 1, ImageResolver)
        .register(TagKind::From, 1, FromResolver)
        .register(TagKind::Input, 1, InputResolver)
        .register(TagKind::OrgHeader, 1, OrgHeaderResolver)
        .register(TagKind::Script, 1, ScriptResolver)
        .register(TagKind::To, 1, ToResolver)
        .register(TagKind::Url, 1, UrlResolver::new(&config.url))
        .register(TagKind::Text, 2, TextResolver)
        .register(TagKind::Header, 2, HeaderResolver);
}
