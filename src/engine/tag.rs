//! The fixed set of directive tag names.

use std::fmt;
use std::str::FromStr;

/// A recognized directive tag.
///
/// Tag names are matched case-insensitively; [`TagKind::as_str`] returns the
/// canonical uppercase spelling used in templates and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagKind {
    Att,
    Clipboard,
    Counter,
    Date,
    File,
    Image,
    From,
    Input,
    OrgAtt,
    OrgHeader,
    Script,
    Subject,
    Text,
    Time,
    To,
    Url,
    Version,
    Selection,
    Header,
}

impl TagKind {
    /// Every recognized tag, in the order the tokenizer tries them.
    pub const ALL: [TagKind; 19] = [
        TagKind::Att,
        TagKind::Clipboard,
        TagKind::Counter,
        TagKind::Date,
        TagKind::File,
        TagKind::Image,
        TagKind::From,
        TagKind::Input,
        TagKind::OrgAtt,
        TagKind::OrgHeader,
        TagKind::Script,
        TagKind::Subject,
        TagKind::Text,
        TagKind::Time,
        TagKind::To,
        TagKind::Url,
        TagKind::Version,
        TagKind::Selection,
        TagKind::Header,
    ];

    /// Canonical uppercase tag name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TagKind::Att => "ATT",
            TagKind::Clipboard => "CLIPBOARD",
            TagKind::Counter => "COUNTER",
            TagKind::Date => "DATE",
            TagKind::File => "FILE",
            TagKind::Image => "IMAGE",
            TagKind::From => "FROM",
            TagKind::Input => "INPUT",
            TagKind::OrgAtt => "ORGATT",
            TagKind::OrgHeader => "ORGHEADER",
            TagKind::Script => "SCRIPT",
            TagKind::Subject => "SUBJECT",
            TagKind::Text => "TEXT",
            TagKind::Time => "TIME",
            TagKind::To => "TO",
            TagKind::Url => "URL",
            TagKind::Version => "VERSION",
            TagKind::Selection => "SELECTION",
            TagKind::Header => "HEADER",
        }
    }

    /// Whether cached data for this tag survives a session data reset.
    ///
    /// Persistent tags hold values that are expensive to recompute and stable
    /// across compose actions: the running counter, the application version and
    /// the headers/attachments of the message being replied to.
    #[must_use]
    pub const fn is_persistent(self) -> bool {
        matches!(
            self,
            TagKind::Counter | TagKind::OrgAtt | TagKind::OrgHeader | TagKind::Version
        )
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a recognized tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTag(pub String);

impl fmt::Display for UnknownTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown directive tag '{}'", self.0)
    }
}

impl std::error::Error for UnknownTag {}

impl FromStr for TagKind {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagKind::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTag(s.to_string()))
    }
}
