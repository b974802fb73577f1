//! Relation names: IANA well-known relations and free-form (optionally namespaced) ones.

use std::fmt;
use std::str::FromStr;

/// Parameter name substituted by clients when expanding a compact URI (`ns:rel`).
pub const REL_PARAM: &str = "rel";

/// Reserved relation holding compact URI entries.
pub const CURIES: &str = "curies";

macro_rules! link_relations {
    ($($variant:ident => $name:literal,)+) => {
        /// Well-defined link relations according to
        /// <http://www.iana.org/assignments/link-relations/link-relations.xhtml>.
        ///
        /// These are never namespaced and always bind to the service they are used from.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum LinkRelation {
            $($variant,)+
        }

        impl LinkRelation {
            /// Hyphenated lowercase form, as rendered in `_links`.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl FromStr for LinkRelation {
            type Err = UnknownLinkRelation;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(UnknownLinkRelation(s.to_owned())),
                }
            }
        }
    };
}

link_relations! {
    About => "about",
    Alternate => "alternate",
    Appendix => "appendix",
    Archives => "archives",
    Author => "author",
    BlockedBy => "blocked-by",
    Bookmark => "bookmark",
    Canonical => "canonical",
    Chapter => "chapter",
    Collection => "collection",
    Contents => "contents",
    Copyright => "copyright",
    CreateForm => "create-form",
    Current => "current",
    Derivedfrom => "derivedfrom",
    Describedby => "describedby",
    Describes => "describes",
    Disclosure => "disclosure",
    DnsPrefetch => "dns-prefetch",
    Duplicate => "duplicate",
    Edit => "edit",
    EditForm => "edit-form",
    EditMedia => "edit-media",
    Enclosure => "enclosure",
    First => "first",
    Glossary => "glossary",
    Help => "help",
    Hosts => "hosts",
    Hub => "hub",
    Icon => "icon",
    Index => "index",
    Item => "item",
    Last => "last",
    LatestVersion => "latest-version",
    License => "license",
    Lrdd => "lrdd",
    Memento => "memento",
    Monitor => "monitor",
    MonitorGroup => "monitor-group",
    Next => "next",
    NextArchive => "next-archive",
    Nofollow => "nofollow",
    Noreferrer => "noreferrer",
    Original => "original",
    Payment => "payment",
    Pingback => "pingback",
    Preconnect => "preconnect",
    PredecessorVersion => "predecessor-version",
    Prefetch => "prefetch",
    Preload => "preload",
    Prerender => "prerender",
    Prev => "prev",
    Preview => "preview",
    Previous => "previous",
    PrevArchive => "prev-archive",
    PrivacyPolicy => "privacy-policy",
    Profile => "profile",
    Related => "related",
    Replies => "replies",
    Search => "search",
    Section => "section",
    SelfRel => "self",
    Service => "service",
    Start => "start",
    Stylesheet => "stylesheet",
    Subsection => "subsection",
    SuccessorVersion => "successor-version",
    Tag => "tag",
    TermsOfService => "terms-of-service",
    Timegate => "timegate",
    Timemap => "timemap",
    Type => "type",
    Up => "up",
    VersionHistory => "version-history",
    Via => "via",
    WorkingCopy => "working-copy",
    WorkingCopyOf => "working-copy-of",
}

impl fmt::Display for LinkRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a string that is not a well-known relation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a well-known link relation")]
pub struct UnknownLinkRelation(pub String);

/// A relation as supplied by callers: well-known, or a free-form name that may
/// carry a `namespace:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rel {
    Known(LinkRelation),
    Named(String),
}

impl Rel {
    /// `true` for the well-known `self` relation.
    #[must_use]
    pub fn is_self(&self) -> bool {
        matches!(self, Self::Known(LinkRelation::SelfRel))
    }
}

impl fmt::Display for Rel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(rel) => f.write_str(rel.as_str()),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl From<LinkRelation> for Rel {
    fn from(rel: LinkRelation) -> Self {
        Self::Known(rel)
    }
}

impl From<&str> for Rel {
    fn from(name: &str) -> Self {
        Self::Named(name.to_owned())
    }
}

impl From<String> for Rel {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<&Rel> for Rel {
    fn from(rel: &Rel) -> Self {
        rel.clone()
    }
}
