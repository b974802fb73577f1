//! Link objects and the intermediate, resolved form they are built from.

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rel::Rel;
use crate::service::ServiceHandle;
use crate::template::{apply_template, is_templated, scalar_to_string};

/// Template parameters; values are any JSON scalar (or an array for repeating parameters).
pub type Params = serde_json::Map<String, Value>;

/// A HAL link object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    /// Only present when the href still contains placeholders
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub templated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Traces back to a registration flagged discoverable
    #[serde(skip)]
    pub discoverable: bool,
}

impl Link {
    /// A link to `href`, marked templated if it contains placeholders.
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        let href = href.into();
        Self {
            templated: is_templated(&href),
            href,
            name: None,
            title: None,
            discoverable: false,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Caller-supplied replacements for what the registry would resolve.
///
/// Every field left unset falls through to the registered value.
#[derive(Debug, Clone, Default)]
pub struct LinkOverrides {
    /// Publish under this relation; it is used verbatim and never re-namespaced.
    pub relation: Option<Rel>,
    pub href: Option<String>,
    /// Replace (rather than extend) the parameter context.
    pub params: Option<Params>,
    /// Resolve as if called from this service.
    pub service: Option<ServiceHandle>,
    /// Force the array form even for a single entry.
    pub array: bool,
    /// Default relations for an embedded resource.
    pub links: Option<Vec<Rel>>,
    /// Name of the parameter whose value becomes the link `name`.
    pub id: Option<String>,
    pub title: Option<String>,
}

impl LinkOverrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn relation(mut self, rel: impl Into<Rel>) -> Self {
        self.relation = Some(rel.into());
        self
    }

    #[must_use]
    pub fn href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Params::new)
            .insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn service(mut self, service: ServiceHandle) -> Self {
        self.service = Some(service);
        self
    }

    #[must_use]
    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    #[must_use]
    pub fn links<I, R>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rel>,
    {
        self.links = Some(links.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// One logical link for a relation: every verb registered on one route, merged.
///
/// Produced by the registry, then refined by the response assembler before it is
/// turned into a [`Link`].
#[derive(Debug, Clone, Default)]
pub struct ResolvedLink {
    pub service: Option<ServiceHandle>,
    /// Normalized relation string (`ns:name` or a well-known name)
    pub rel: String,
    pub href: Option<String>,
    /// Verbs available on this href, in registration order
    pub verbs: Vec<Method>,
    /// Default relations for a resource embedded under this link
    pub links: Vec<Rel>,
    /// Parameter name on the registry side; parameter value once resolved for a request
    pub id: Option<String>,
    pub title: Option<String>,
    pub params: Params,
    pub array: bool,
    pub discoverable: bool,
}

impl ResolvedLink {
    /// Expand the href against the resolved parameters.
    #[must_use]
    pub fn to_link(&self) -> Link {
        let href = self
            .href
            .as_deref()
            .map(|href| apply_template(href, &self.params))
            .unwrap_or_default();
        Link {
            name: self.id.clone(),
            title: self.title.clone(),
            discoverable: self.discoverable,
            ..Link::new(href)
        }
    }

    /// Turn the id parameter *name* into that parameter's runtime *value*.
    pub(crate) fn resolve_id(&mut self) {
        self.id = self
            .id
            .take()
            .and_then(|name| self.params.get(&name).filter(|v| !v.is_null()))
            .map(scalar_to_string);
    }
}
