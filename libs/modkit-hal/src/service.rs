//! Declarative registration API.
//!
//! A service describes its namespaces and routes with a [`ServiceDecl`] while it is being
//! constructed, and hands the finished declaration to
//! [`RelationRegistry::install`](crate::RelationRegistry::install).

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::link::{Params, ResolvedLink};
use crate::rel::{LinkRelation, Rel};

/// Opaque identity of a service installed into a [`RelationRegistry`](crate::RelationRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceHandle(usize);

impl ServiceHandle {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service#{}", self.0)
    }
}

/// Supplies documentation for a relation (by its normalized name) that has no description of its own.
pub type DocsFallback = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Post-processes every merged link a service produces.
pub type LinkHook = Arc<dyn Fn(ResolvedLink) -> ResolvedLink + Send + Sync>;

/// Human-readable description of what a relation does on one verb.
#[derive(Clone)]
pub enum Description {
    Text(String),
    /// Computed from the normalized relation when documentation is rendered
    Dynamic(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl Description {
    #[must_use]
    pub fn render(&self, relation: &str) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Dynamic(describe) => describe(relation),
        }
    }
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for Description {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Description {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Options for a namespace declared by a service.
#[derive(Clone, Default)]
pub struct NamespaceOptions {
    /// Documentation href template; defaults to `/docs/<name>/:rel`.
    pub docs_href: Option<String>,
    /// Serve generated documentation at `docs_href`. Defaults to `true` only when no
    /// explicit href is given.
    pub auto_document: Option<bool>,
    pub fallback: Option<DocsFallback>,
}

impl NamespaceOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn docs_href(mut self, href: impl Into<String>) -> Self {
        self.docs_href = Some(href.into());
        self
    }

    #[must_use]
    pub fn auto_document(mut self, enabled: bool) -> Self {
        self.auto_document = Some(enabled);
        self
    }

    #[must_use]
    pub fn fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    pub(crate) fn resolve_href(&self, name: &str) -> String {
        self.docs_href
            .clone()
            .unwrap_or_else(|| format!("/docs/{name}/:rel"))
    }

    pub(crate) fn resolve_auto(&self) -> bool {
        self.auto_document.unwrap_or(self.docs_href.is_none())
    }
}

impl fmt::Debug for NamespaceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceOptions")
            .field("docs_href", &self.docs_href)
            .field("auto_document", &self.auto_document)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// Options attached to a relation provided by a route.
#[derive(Debug, Clone, Default)]
pub struct RelOptions {
    /// List this relation in the discovery document.
    pub discoverable: bool,
    /// Parameters baked into the registration; they also concretize the path.
    pub params: Params,
    /// Name of the parameter whose runtime value becomes the link `name`.
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<Description>,
    /// Always render this relation as an array.
    pub array: bool,
    /// Default relations of the resource found at this route.
    pub links: Vec<Rel>,
}

impl RelOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn discoverable(mut self) -> Self {
        self.discoverable = true;
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
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

    #[must_use]
    pub fn description(mut self, description: impl Into<Description>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn describe_with<F>(mut self, describe: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.description = Some(Description::Dynamic(Arc::new(describe)));
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
        self.links = links.into_iter().map(Into::into).collect();
        self
    }
}

/// One handler: a verb on a path, the relations it provides and the relations its
/// responses link to by default.
#[derive(Debug, Clone)]
pub struct RouteDecl {
    pub(crate) verb: String,
    pub(crate) path: String,
    pub(crate) provides: Vec<(Rel, RelOptions)>,
    pub(crate) hal: Vec<Rel>,
    pub(crate) self_link: Option<bool>,
}

impl RouteDecl {
    fn new(verb: &str, path: &str) -> Self {
        Self {
            verb: verb.to_ascii_uppercase(),
            path: path.to_owned(),
            provides: Vec::new(),
            hal: Vec::new(),
            self_link: None,
        }
    }

    /// Publish this route under `rel`.
    pub fn provides(&mut self, rel: impl Into<Rel>, options: RelOptions) -> &mut Self {
        self.provides.push((rel.into(), options));
        self
    }

    /// Add a default relation to responses of this handler.
    pub fn hal(&mut self, rel: impl Into<Rel>) -> &mut Self {
        self.hal.push(rel.into());
        self
    }

    pub fn hal_links<I, R>(&mut self, links: I) -> &mut Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rel>,
    {
        self.hal.extend(links.into_iter().map(Into::into));
        self
    }

    /// Force the automatic `self` link on or off. `GET` routes have it unless disabled.
    pub fn self_link(&mut self, enabled: bool) -> &mut Self {
        self.self_link = Some(enabled);
        self
    }

    #[must_use]
    pub fn verb(&self) -> &str {
        &self.verb
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Default relations of this handler's responses, `self` first when enabled.
    #[must_use]
    pub fn default_links(&self) -> Vec<Rel> {
        let wants_self = self.self_link.unwrap_or(self.verb == "GET");
        let mut links = Vec::with_capacity(self.hal.len() + 1);
        if wants_self && !self.hal.iter().any(Rel::is_self) {
            links.push(Rel::Known(LinkRelation::SelfRel));
        }
        links.extend(self.hal.iter().cloned());
        links
    }
}

/// Everything one service contributes to a registry.
#[derive(Clone)]
pub struct ServiceDecl {
    pub(crate) name: String,
    pub(crate) base_path: String,
    pub(crate) namespaces: Vec<(String, NamespaceOptions)>,
    pub(crate) routes: Vec<RouteDecl>,
    pub(crate) link_hook: Option<LinkHook>,
}

impl ServiceDecl {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_path: String::new(),
            namespaces: Vec::new(),
            routes: Vec::new(),
            link_hook: None,
        }
    }

    /// Where the service is mounted; hrefs starting with `/` are made relative to it.
    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Declare a namespace. The first one declared is the service's default namespace.
    pub fn declare_namespace(
        &mut self,
        name: impl Into<String>,
        options: NamespaceOptions,
    ) -> &mut Self {
        let name = name.into();
        match self.namespaces.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = options,
            None => self.namespaces.push((name, options)),
        }
        self
    }

    /// Declare a handler; `verb` is case-insensitive and validated on install.
    pub fn declare_route(&mut self, verb: impl AsRef<str>, path: impl AsRef<str>) -> &mut RouteDecl {
        self.routes.push(RouteDecl::new(verb.as_ref(), path.as_ref()));
        let last = self.routes.len() - 1;
        &mut self.routes[last]
    }

    /// Flatten another declaration into this one.
    ///
    /// Inherited routes are registered before this service's own, so an identical
    /// relation, path and verb declared here replaces the inherited one.
    ///
    /// Inherited routes belong to this service: bare relation names are normalized
    /// against this service's default namespace, not the parent's. A child that declares
    /// its own namespace first publishes `inherited` as `child:inherited`; the parent
    /// keeps a relation under its own namespace only by declaring it qualified
    /// (`parent:inherited`).
    pub fn inherit(&mut self, parent: &Self) -> &mut Self {
        for (name, options) in &parent.namespaces {
            if !self.namespaces.iter().any(|(n, _)| n == name) {
                self.namespaces.push((name.clone(), options.clone()));
            }
        }
        self.routes.splice(0..0, parent.routes.iter().cloned());
        if self.link_hook.is_none() {
            self.link_hook.clone_from(&parent.link_hook);
        }
        self
    }

    /// Install a hook that post-processes every merged link of this service.
    pub fn on_link<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(ResolvedLink) -> ResolvedLink + Send + Sync + 'static,
    {
        self.link_hook = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn routes(&self) -> &[RouteDecl] {
        &self.routes
    }
}

impl fmt::Debug for ServiceDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDecl")
            .field("name", &self.name)
            .field("base_path", &self.base_path)
            .field("namespaces", &self.namespaces)
            .field("routes", &self.routes)
            .field("link_hook", &self.link_hook.is_some())
            .finish()
    }
}
