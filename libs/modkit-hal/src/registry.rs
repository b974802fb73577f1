//! Relation Registry: which service provides which relation, on which routes.
//!
//! The registry is filled once during startup (see [`RelationRegistry::install`]) and
//! only read afterwards, so request handlers share it behind an `Arc` without locking.

use std::fmt;

use http::Method;

use crate::docs::{RelationDocs, RouteDocs, VerbDocs};
use crate::error::HalError;
use crate::link::{Params, ResolvedLink};
use crate::rel::Rel;
use crate::response::HalResource;
use crate::service::{
    DocsFallback, LinkHook, NamespaceOptions, RelOptions, ServiceDecl, ServiceHandle,
};
use crate::template::apply_template;

/// A namespace as registered by its owning service.
#[derive(Clone)]
pub struct Namespace {
    pub name: String,
    /// Documentation href template as declared (not yet relative to the base path)
    pub docs_href: String,
    pub auto_document: bool,
    pub fallback: Option<DocsFallback>,
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("docs_href", &self.docs_href)
            .field("auto_document", &self.auto_document)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// Documentation entry of a namespace, with its href made relative to the owner's base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDocs {
    pub name: String,
    pub href: String,
}

/// Outcome of resolving a relation from some service's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Service owning the relation, or the context service when no owner was found
    pub service: Option<ServiceHandle>,
    /// Normalized relation string
    pub rel: String,
    pub namespace: Option<String>,
}

struct Registration {
    verb: Method,
    options: RelOptions,
}

struct RouteEntry {
    path: String,
    registrations: Vec<Registration>,
}

struct RelationEntry {
    rel: Rel,
    key: String,
    routes: Vec<RouteEntry>,
}

struct HandlerEntry {
    verb: Method,
    path: String,
    links: Vec<Rel>,
}

struct ServiceEntry {
    name: String,
    base_path: String,
    namespaces: Vec<Namespace>,
    relations: Vec<RelationEntry>,
    handlers: Vec<HandlerEntry>,
    link_hook: Option<LinkHook>,
}

impl ServiceEntry {
    fn default_namespace(&self) -> Option<&str> {
        self.namespaces.first().map(|ns| ns.name.as_str())
    }

    fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|ns| ns.name == name)
    }

    fn relation(&self, key: &str) -> Option<&RelationEntry> {
        self.relations.iter().find(|r| r.key == key)
    }

    fn relative(&self, href: &str) -> String {
        relative_to(&self.base_path, href)
    }
}

pub(crate) fn relative_to(base_path: &str, href: &str) -> String {
    if href.starts_with('/') {
        format!("{}{href}", base_path.trim_end_matches('/'))
    } else {
        href.to_owned()
    }
}

/// Verbs the dispatch layer can route.
fn parse_verb(verb: &str) -> Result<Method, HalError> {
    match verb.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "HEAD" => Ok(Method::HEAD),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        "PATCH" => Ok(Method::PATCH),
        "OPTIONS" => Ok(Method::OPTIONS),
        "TRACE" => Ok(Method::TRACE),
        "CONNECT" => Ok(Method::CONNECT),
        _ => Err(HalError::InvalidVerb {
            verb: verb.to_owned(),
        }),
    }
}

/// In-memory table of services, namespaces and the routes providing each relation.
#[derive(Default)]
pub struct RelationRegistry {
    services: Vec<ServiceEntry>,
    /// Namespace name to the services declaring it, in registration order
    owners: Vec<(String, Vec<ServiceHandle>)>,
}

impl fmt::Debug for RelationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.services.iter().map(|s| s.name.as_str()).collect();
        f.debug_struct("RelationRegistry")
            .field("services", &names)
            .field("namespaces", &self.owners.len())
            .finish_non_exhaustive()
    }
}

impl RelationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle for a new service mounted at `base_path`.
    pub fn add_service(
        &mut self,
        name: impl Into<String>,
        base_path: impl Into<String>,
    ) -> ServiceHandle {
        let handle = ServiceHandle::new(self.services.len());
        self.services.push(ServiceEntry {
            name: name.into(),
            base_path: base_path.into(),
            namespaces: Vec::new(),
            relations: Vec::new(),
            handlers: Vec::new(),
            link_hook: None,
        });
        handle
    }

    /// Register everything a service declared and return its handle.
    ///
    /// Routes declared with a verb the dispatch layer cannot route are logged and skipped;
    /// the rest of the declaration is still installed.
    pub fn install(&mut self, decl: ServiceDecl) -> ServiceHandle {
        let ServiceDecl {
            name,
            base_path,
            namespaces,
            routes,
            link_hook,
        } = decl;
        let service = self.add_service(name, base_path);
        let index = service.index();
        self.services[index].link_hook = link_hook;

        for (ns, options) in namespaces {
            self.insert_namespace(index, ns, &options);
        }

        for route in routes {
            let defaults = route.default_links();
            let verb = match parse_verb(&route.verb) {
                Ok(verb) => verb,
                Err(err) => {
                    tracing::error!(
                        service = %self.services[index].name,
                        path = %route.path,
                        error = %err,
                        "Skipping route"
                    );
                    continue;
                }
            };
            self.insert_handler(index, verb.clone(), &route.path, defaults.clone());

            for (rel, mut options) in route.provides {
                let mut links = defaults.clone();
                for extra in options.links {
                    if !links.contains(&extra) {
                        links.push(extra);
                    }
                }
                options.links = links;
                self.insert_route(index, &rel, verb.clone(), &route.path, options);
            }
        }
        service
    }

    /// Register a namespace for `service`. Registering the same name twice for one
    /// service replaces the earlier entry.
    ///
    /// # Errors
    /// Returns [`HalError::UnknownService`] if the handle was not issued by this registry.
    pub fn register_namespace(
        &mut self,
        service: ServiceHandle,
        name: impl Into<String>,
        options: &NamespaceOptions,
    ) -> Result<(), HalError> {
        self.check(service)?;
        self.insert_namespace(service.index(), name.into(), options);
        Ok(())
    }

    /// Register one verb on one path as providing `rel`. An existing registration with the
    /// same relation, path and verb is replaced.
    ///
    /// # Errors
    /// Returns [`HalError::UnknownService`] for a foreign handle and
    /// [`HalError::InvalidVerb`] for a verb the dispatch layer cannot route.
    pub fn register_route(
        &mut self,
        service: ServiceHandle,
        rel: impl Into<Rel>,
        verb: &str,
        path: &str,
        options: RelOptions,
    ) -> Result<(), HalError> {
        self.check(service)?;
        let verb = parse_verb(verb)?;
        self.insert_route(service.index(), &rel.into(), verb, path, options);
        Ok(())
    }

    fn check(&self, service: ServiceHandle) -> Result<(), HalError> {
        if service.index() < self.services.len() {
            Ok(())
        } else {
            Err(HalError::UnknownService(service))
        }
    }

    fn insert_namespace(&mut self, index: usize, name: String, options: &NamespaceOptions) {
        let namespace = Namespace {
            docs_href: options.resolve_href(&name),
            auto_document: options.resolve_auto(),
            fallback: options.fallback.clone(),
            name,
        };
        let entry = &mut self.services[index];
        tracing::debug!(
            service = %entry.name,
            namespace = %namespace.name,
            docs = %namespace.docs_href,
            "Registered namespace"
        );

        if let Some(existing) = entry.namespaces.iter_mut().find(|ns| ns.name == namespace.name) {
            if existing.docs_href != namespace.docs_href {
                tracing::warn!(
                    service = %entry.name,
                    namespace = %namespace.name,
                    "Namespace registered twice; keeping the latest documentation href"
                );
            }
            *existing = namespace;
            return;
        }

        let handle = ServiceHandle::new(index);
        match self.owners.iter_mut().find(|(name, _)| *name == namespace.name) {
            Some((_, owners)) => {
                tracing::debug!(
                    service = %entry.name,
                    namespace = %namespace.name,
                    owners = owners.len() + 1,
                    "Namespace shared by several services; earlier registrations resolve first"
                );
                owners.push(handle);
            }
            None => self.owners.push((namespace.name.clone(), vec![handle])),
        }
        entry.namespaces.push(namespace);
    }

    fn insert_handler(&mut self, index: usize, verb: Method, path: &str, links: Vec<Rel>) {
        let handlers = &mut self.services[index].handlers;
        match handlers.iter_mut().find(|h| h.verb == verb && h.path == path) {
            Some(handler) => handler.links = links,
            None => handlers.push(HandlerEntry {
                verb,
                path: path.to_owned(),
                links,
            }),
        }
    }

    fn insert_route(
        &mut self,
        index: usize,
        rel: &Rel,
        verb: Method,
        path: &str,
        options: RelOptions,
    ) {
        let key = self.normalize(Some(ServiceHandle::new(index)), rel);
        let path = if options.params.is_empty() {
            path.to_owned()
        } else {
            apply_template(path, &options.params)
        };
        let entry = &mut self.services[index];
        tracing::debug!(
            service = %entry.name,
            rel = %key,
            verb = %verb,
            path = %path,
            "Registered link relation"
        );

        let stored = match rel {
            Rel::Known(known) => Rel::Known(*known),
            Rel::Named(_) => Rel::Named(key.clone()),
        };
        let relation = match entry.relations.iter().position(|r| r.key == key) {
            Some(pos) => &mut entry.relations[pos],
            None => {
                entry.relations.push(RelationEntry {
                    rel: stored,
                    key,
                    routes: Vec::new(),
                });
                let last = entry.relations.len() - 1;
                &mut entry.relations[last]
            }
        };
        let route = match relation.routes.iter().position(|r| r.path == path) {
            Some(pos) => &mut relation.routes[pos],
            None => {
                relation.routes.push(RouteEntry {
                    path,
                    registrations: Vec::new(),
                });
                let last = relation.routes.len() - 1;
                &mut relation.routes[last]
            }
        };
        let registration = Registration { verb, options };
        match route
            .registrations
            .iter_mut()
            .find(|r| r.verb == registration.verb)
        {
            Some(existing) => *existing = registration,
            None => route.registrations.push(registration),
        }
    }

    /// Resolve `rel` as seen from `context`.
    ///
    /// - Well-known relations are never namespaced and stay bound to `context`.
    /// - A bare name takes the default namespace of `context`, if it has one.
    /// - A namespaced name resolves to the first service declaring that namespace and
    ///   providing the relation, falling back to `context`.
    #[must_use]
    pub fn resolve(&self, context: Option<ServiceHandle>, rel: &Rel) -> Resolution {
        let name = match rel {
            Rel::Known(known) => {
                return Resolution {
                    service: context,
                    rel: known.as_str().to_owned(),
                    namespace: None,
                };
            }
            Rel::Named(name) => name,
        };

        let qualified = if name.contains(':') {
            name.clone()
        } else {
            let default_ns = context
                .and_then(|s| self.services.get(s.index()))
                .and_then(ServiceEntry::default_namespace);
            match default_ns {
                Some(ns) => format!("{ns}:{name}"),
                None => {
                    return Resolution {
                        service: context,
                        rel: name.clone(),
                        namespace: None,
                    };
                }
            }
        };

        let namespace = match qualified.split_once(':') {
            Some((ns, _)) if !ns.is_empty() => ns.to_owned(),
            _ => {
                return Resolution {
                    service: context,
                    rel: qualified,
                    namespace: None,
                };
            }
        };

        let owner = self.owners_of(&namespace).iter().copied().find(|s| {
            self.services
                .get(s.index())
                .is_some_and(|entry| entry.relation(&qualified).is_some())
        });
        Resolution {
            service: owner.or(context),
            rel: qualified,
            namespace: Some(namespace),
        }
    }

    /// Normalized string form of `rel` as seen from `context`.
    #[must_use]
    pub fn normalize(&self, context: Option<ServiceHandle>, rel: &Rel) -> String {
        self.resolve(context, rel).rel
    }

    /// Every route providing `rel`, one merged link per distinct path, in registration order.
    ///
    /// Verbs sharing a path merge into one link: `href` comes from the first verb,
    /// `id` and `title` from the first verb that sets them, and parameters are unioned
    /// with earlier verbs winning on conflict.
    #[must_use]
    pub fn get_links(&self, context: Option<ServiceHandle>, rel: &Rel) -> Vec<ResolvedLink> {
        let resolution = self.resolve(context, rel);
        let Some(service) = resolution.service else {
            return Vec::new();
        };
        let Some(entry) = self.services.get(service.index()) else {
            return Vec::new();
        };
        let Some(relation) = entry.relation(&resolution.rel) else {
            return Vec::new();
        };

        relation
            .routes
            .iter()
            .map(|route| {
                let merged = merge_route(service, entry, &resolution.rel, route);
                match &entry.link_hook {
                    Some(hook) => hook(merged),
                    None => merged,
                }
            })
            .collect()
    }

    /// Documentation entry for the namespace of `rel`, if it has one.
    #[must_use]
    pub fn get_docs(&self, context: Option<ServiceHandle>, rel: &Rel) -> Option<NamespaceDocs> {
        let resolution = self.resolve(context, rel);
        let namespace = resolution.namespace?;
        self.namespace_docs(resolution.service, &namespace)
    }

    /// Documentation entry for an already normalized relation string.
    pub(crate) fn docs_for_normalized(
        &self,
        service: Option<ServiceHandle>,
        rel: &str,
    ) -> Option<NamespaceDocs> {
        match rel.split_once(':') {
            Some((ns, _)) if !ns.is_empty() => self.namespace_docs(service, ns),
            _ => None,
        }
    }

    fn namespace_docs(&self, service: Option<ServiceHandle>, name: &str) -> Option<NamespaceDocs> {
        let own = service
            .and_then(|s| self.services.get(s.index()))
            .filter(|entry| entry.namespace(name).is_some());
        let entry = own.or_else(|| {
            self.owners_of(name)
                .first()
                .and_then(|s| self.services.get(s.index()))
        })?;
        let namespace = entry.namespace(name)?;
        Some(NamespaceDocs {
            name: namespace.name.clone(),
            href: entry.relative(&namespace.docs_href),
        })
    }

    fn owners_of(&self, namespace: &str) -> &[ServiceHandle] {
        self.owners
            .iter()
            .find(|(name, _)| name == namespace)
            .map(|(_, owners)| owners.as_slice())
            .unwrap_or_default()
    }

    /// Services that registered at least one namespace, in registration order.
    #[must_use]
    pub fn list_services(&self) -> Vec<ServiceHandle> {
        self.services
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.namespaces.is_empty())
            .map(|(index, _)| ServiceHandle::new(index))
            .collect()
    }

    /// Namespaces declared by `service`; the first one is its default namespace.
    #[must_use]
    pub fn namespaces(&self, service: ServiceHandle) -> &[Namespace] {
        self.services
            .get(service.index())
            .map(|entry| entry.namespaces.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn service_name(&self, service: ServiceHandle) -> Option<&str> {
        self.services.get(service.index()).map(|s| s.name.as_str())
    }

    #[must_use]
    pub fn base_path(&self, service: ServiceHandle) -> Option<&str> {
        self.services
            .get(service.index())
            .map(|s| s.base_path.as_str())
    }

    /// Default relations for responses of the handler declared as `verb` on `path`.
    #[must_use]
    pub fn default_links(&self, service: ServiceHandle, verb: &str, path: &str) -> Vec<Rel> {
        self.services
            .get(service.index())
            .and_then(|entry| {
                entry
                    .handlers
                    .iter()
                    .find(|h| h.path == path && h.verb.as_str().eq_ignore_ascii_case(verb))
            })
            .map(|h| h.links.clone())
            .unwrap_or_default()
    }

    /// Relations of `service` with at least one registration flagged discoverable.
    #[must_use]
    pub fn discoverable_relations(&self, service: ServiceHandle) -> Vec<Rel> {
        self.services
            .get(service.index())
            .map(|entry| {
                entry
                    .relations
                    .iter()
                    .filter(|relation| {
                        relation.routes.iter().any(|route| {
                            route.registrations.iter().any(|r| r.options.discoverable)
                        })
                    })
                    .map(|relation| relation.rel.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Routes and verbs providing `namespace:relation`, for the documentation endpoint.
    #[must_use]
    pub fn describe(&self, namespace: &str, relation: &str) -> Option<RelationDocs> {
        let resolution = self.resolve(None, &Rel::Named(format!("{namespace}:{relation}")));
        let entry = self.services.get(resolution.service?.index())?;
        let provided = entry.relation(&resolution.rel)?;

        let routes: Vec<RouteDocs> = provided
            .routes
            .iter()
            .map(|route| RouteDocs {
                href: entry.relative(&route.path),
                verbs: route
                    .registrations
                    .iter()
                    .map(|r| VerbDocs {
                        verb: r.verb.clone(),
                        title: r.options.title.clone(),
                        description: r
                            .options
                            .description
                            .as_ref()
                            .map(|d| d.render(&resolution.rel)),
                    })
                    .collect(),
            })
            .collect();

        let described = routes
            .iter()
            .flat_map(|route| &route.verbs)
            .any(|verb| verb.description.is_some());
        let description = if described {
            None
        } else {
            entry
                .namespace(namespace)
                .and_then(|ns| ns.fallback.as_ref())
                .and_then(|fallback| fallback(&resolution.rel))
        };

        Some(RelationDocs {
            relation: resolution.rel,
            description,
            routes,
        })
    }

    /// Start a HAL document for a request handled by `service`.
    ///
    /// `self` among `defaults` becomes a literal link to `request_path`; every other
    /// default relation is linked through the registry.
    #[must_use]
    pub fn create(
        &self,
        service: Option<ServiceHandle>,
        request_path: &str,
        defaults: &[Rel],
        params: Params,
    ) -> HalResource<'_> {
        HalResource::create(self, service, request_path, defaults, params)
    }
}

fn merge_route(
    service: ServiceHandle,
    entry: &ServiceEntry,
    rel: &str,
    route: &RouteEntry,
) -> ResolvedLink {
    let registrations = &route.registrations;

    let mut links: Vec<Rel> = Vec::new();
    for link in registrations.iter().flat_map(|r| &r.options.links) {
        if !links.contains(link) {
            links.push(link.clone());
        }
    }

    // reverse fold: earlier registrations are applied last and win
    let params = registrations
        .iter()
        .rev()
        .fold(Params::new(), |mut params, r| {
            params.extend(r.options.params.clone());
            params
        });

    ResolvedLink {
        service: Some(service),
        rel: rel.to_owned(),
        href: Some(entry.relative(&route.path)),
        verbs: registrations.iter().map(|r| r.verb.clone()).collect(),
        links,
        id: registrations.iter().find_map(|r| r.options.id.clone()),
        title: registrations.iter().find_map(|r| r.options.title.clone()),
        params,
        array: registrations.iter().any(|r| r.options.array),
        discoverable: registrations.iter().any(|r| r.options.discoverable),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::rel::LinkRelation;
    use serde_json::json;

    fn two_services() -> (RelationRegistry, ServiceHandle, ServiceHandle) {
        let mut test = ServiceDecl::new("test").base_path("/api/test");
        test.declare_namespace("test", NamespaceOptions::new());
        test.declare_route("GET", "/default")
            .provides("default", RelOptions::new().discoverable());
        test.declare_route("GET", "/duplicate").provides("duplicate", RelOptions::new());
        test.declare_route("PUT", "/duplicate")
            .provides("duplicate", RelOptions::new().title("Replace"));
        test.declare_route("GET", "/distinct").provides("duplicate", RelOptions::new());
        test.declare_route("GET", "/index").provides(LinkRelation::Index, RelOptions::new());

        let mut alt = ServiceDecl::new("alt").base_path("/api/alt");
        alt.declare_namespace(
            "alt",
            NamespaceOptions::new().docs_href("http://www.adatum.com/docs/{rel}"),
        );
        alt.declare_route("GET", "/cross")
            .provides("cross", RelOptions::new().discoverable())
            .hal("test:default");

        let mut registry = RelationRegistry::new();
        let test = registry.install(test);
        let alt = registry.install(alt);
        (registry, test, alt)
    }

    #[test]
    fn namespaced_relations_resolve_from_any_context() {
        let (registry, test, alt) = two_services();
        let expected = Resolution {
            service: Some(alt),
            rel: "alt:cross".to_owned(),
            namespace: Some("alt".to_owned()),
        };
        for context in [None, Some(test), Some(alt)] {
            assert_eq!(registry.resolve(context, &"alt:cross".into()), expected);
        }
    }

    #[test]
    fn bare_relations_take_the_default_namespace() {
        let (registry, test, _) = two_services();
        assert_eq!(registry.normalize(Some(test), &"default".into()), "test:default");
        assert_eq!(registry.normalize(None, &"default".into()), "default");

        let resolution = registry.resolve(Some(test), &LinkRelation::Index.into());
        assert_eq!(resolution.rel, "index");
        assert_eq!(resolution.namespace, None);
    }

    #[test]
    fn unknown_namespaced_relations_fall_back_to_context() {
        let (registry, test, _) = two_services();
        let resolution = registry.resolve(Some(test), &"alt:missing".into());
        assert_eq!(resolution.service, Some(test));
        assert!(registry.get_links(Some(test), &"alt:missing".into()).is_empty());
    }

    #[test]
    fn shared_namespaces_prefer_the_first_owner() {
        let mut a = ServiceDecl::new("a").base_path("/a");
        a.declare_namespace("catalog", NamespaceOptions::new());
        a.declare_route("GET", "/shared").provides("shared", RelOptions::new());

        let mut b = ServiceDecl::new("b").base_path("/b");
        b.declare_namespace("catalog", NamespaceOptions::new());
        b.declare_route("GET", "/shared").provides("shared", RelOptions::new());
        b.declare_route("GET", "/only").provides("only", RelOptions::new());

        let mut registry = RelationRegistry::new();
        let a = registry.install(a);
        let b = registry.install(b);

        let shared = registry.resolve(Some(b), &"catalog:shared".into());
        assert_eq!(shared.service, Some(a));
        let links = registry.get_links(Some(b), &"catalog:shared".into());
        assert_eq!(links[0].href.as_deref(), Some("/a/shared"));

        let only = registry.resolve(Some(a), &"catalog:only".into());
        assert_eq!(only.service, Some(b));
        assert_eq!(only.namespace.as_deref(), Some("catalog"));

        let docs = registry.get_docs(Some(a), &"catalog:only".into()).unwrap();
        assert_eq!(docs.href, "/b/docs/catalog/:rel");
    }

    #[test]
    fn inherited_bare_relations_take_the_child_namespace() {
        let mut parent = ServiceDecl::new("parent");
        parent.declare_namespace("parent", NamespaceOptions::new());
        parent.declare_route("GET", "/inherited").provides("inherited", RelOptions::new());
        parent
            .declare_route("GET", "/qualified")
            .provides("parent:qualified", RelOptions::new());

        let mut child = ServiceDecl::new("child").base_path("/child");
        child.declare_namespace("child", NamespaceOptions::new());
        child.inherit(&parent);

        let mut registry = RelationRegistry::new();
        let child = registry.install(child);

        assert!(registry.get_links(Some(child), &"parent:inherited".into()).is_empty());
        let links = registry.get_links(Some(child), &"child:inherited".into());
        assert_eq!(links[0].href.as_deref(), Some("/child/inherited"));

        let links = registry.get_links(None, &"parent:qualified".into());
        assert_eq!(links[0].href.as_deref(), Some("/child/qualified"));
    }

    #[test]
    fn verbs_on_one_path_merge() {
        let (registry, test, _) = two_services();
        let links = registry.get_links(Some(test), &"duplicate".into());
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href.as_deref(), Some("/api/test/duplicate"));
        assert_eq!(links[0].verbs, vec![Method::GET, Method::PUT]);
        assert_eq!(links[0].title.as_deref(), Some("Replace"));
        assert_eq!(links[1].href.as_deref(), Some("/api/test/distinct"));
        assert_eq!(links[1].verbs, vec![Method::GET]);
    }

    #[test]
    fn earlier_verbs_win_parameter_conflicts() {
        let mut registry = RelationRegistry::new();
        let svc = registry.add_service("svc", "");
        registry
            .register_namespace(svc, "svc", &NamespaceOptions::new())
            .unwrap();
        registry
            .register_route(svc, "item", "get", "/items", RelOptions::new().param("a", 1))
            .unwrap();
        registry
            .register_route(
                svc,
                "item",
                "post",
                "/items",
                RelOptions::new().param("a", 2).param("b", 3),
            )
            .unwrap();

        let links = registry.get_links(Some(svc), &"item".into());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].params.get("a"), Some(&json!(1)));
        assert_eq!(links[0].params.get("b"), Some(&json!(3)));
    }

    #[test]
    fn duplicate_registration_replaces() {
        let mut registry = RelationRegistry::new();
        let svc = registry.add_service("svc", "");
        registry
            .register_route(svc, "item", "GET", "/items", RelOptions::new().title("first"))
            .unwrap();
        registry
            .register_route(svc, "item", "GET", "/items", RelOptions::new().title("second"))
            .unwrap();

        let links = registry.get_links(Some(svc), &"item".into());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].verbs.len(), 1);
        assert_eq!(links[0].title.as_deref(), Some("second"));
    }

    #[test]
    fn invalid_verbs_are_rejected_and_skipped() {
        let mut registry = RelationRegistry::new();
        let svc = registry.add_service("svc", "");
        let err = registry
            .register_route(svc, "item", "FETCH", "/items", RelOptions::new())
            .unwrap_err();
        assert!(matches!(err, HalError::InvalidVerb { .. }));

        let mut decl = ServiceDecl::new("decl");
        decl.declare_namespace("decl", NamespaceOptions::new());
        decl.declare_route("FETCH", "/bad").provides("bad", RelOptions::new());
        decl.declare_route("GET", "/good").provides("good", RelOptions::new());
        let decl = registry.install(decl);

        assert!(registry.get_links(Some(decl), &"bad".into()).is_empty());
        assert_eq!(registry.get_links(Some(decl), &"good".into()).len(), 1);
    }

    #[test]
    fn foreign_handles_are_rejected() {
        let mut registry = RelationRegistry::new();
        let err = registry
            .register_namespace(ServiceHandle::new(7), "ns", &NamespaceOptions::new())
            .unwrap_err();
        assert!(matches!(err, HalError::UnknownService(_)));
    }

    #[test]
    fn namespace_reregistration_keeps_latest() {
        let mut registry = RelationRegistry::new();
        let svc = registry.add_service("svc", "/base");
        registry
            .register_namespace(svc, "ns", &NamespaceOptions::new())
            .unwrap();
        registry
            .register_namespace(svc, "ns", &NamespaceOptions::new().docs_href("/manual/:rel"))
            .unwrap();

        assert_eq!(registry.namespaces(svc).len(), 1);
        let docs = registry.get_docs(Some(svc), &"ns:anything".into());
        assert_eq!(
            docs,
            Some(NamespaceDocs {
                name: "ns".to_owned(),
                href: "/base/manual/:rel".to_owned(),
            })
        );
    }

    #[test]
    fn docs_are_relative_to_the_owner() {
        let (registry, test, _) = two_services();
        let docs = registry.get_docs(Some(test), &"default".into());
        assert_eq!(docs.map(|d| d.href).as_deref(), Some("/api/test/docs/test/:rel"));

        let docs = registry.get_docs(Some(test), &"alt:cross".into());
        assert_eq!(docs.map(|d| d.href).as_deref(), Some("http://www.adatum.com/docs/{rel}"));

        assert_eq!(registry.get_docs(Some(test), &LinkRelation::Index.into()), None);
    }

    #[test]
    fn services_and_discoverable_relations() {
        let (mut registry, test, alt) = two_services();
        registry.add_service("anonymous", "/");
        assert_eq!(registry.list_services(), vec![test, alt]);
        assert_eq!(registry.discoverable_relations(test), vec![Rel::from("test:default")]);
        assert_eq!(registry.discoverable_relations(alt), vec![Rel::from("alt:cross")]);
    }

    #[test]
    fn default_links_include_self_for_get() {
        let (registry, _, alt) = two_services();
        assert_eq!(
            registry.default_links(alt, "get", "/cross"),
            vec![LinkRelation::SelfRel.into(), Rel::from("test:default")]
        );
        assert!(registry.default_links(alt, "POST", "/cross").is_empty());

        let links = registry.get_links(Some(alt), &"cross".into());
        assert_eq!(links[0].links.len(), 2);
    }

    #[test]
    fn link_hooks_post_process_merged_links() {
        let mut decl = ServiceDecl::new("hooked");
        decl.declare_namespace("hooked", NamespaceOptions::new());
        decl.declare_route("GET", "/items").provides("items", RelOptions::new());
        decl.on_link(|mut link| {
            link.title = Some("Hooked".to_owned());
            link
        });
        let mut registry = RelationRegistry::new();
        let svc = registry.install(decl);

        let links = registry.get_links(Some(svc), &"items".into());
        assert_eq!(links[0].title.as_deref(), Some("Hooked"));
    }

    #[test]
    fn registration_params_concretize_the_path() {
        let mut registry = RelationRegistry::new();
        let svc = registry.add_service("svc", "");
        registry
            .register_route(svc, "first", "GET", "/items/:id", RelOptions::new().param("id", 1))
            .unwrap();
        registry
            .register_route(svc, "first", "GET", "/items/:id", RelOptions::new())
            .unwrap();

        let links = registry.get_links(Some(svc), &"first".into());
        let hrefs: Vec<_> = links.iter().filter_map(|l| l.href.as_deref()).collect();
        assert_eq!(hrefs, vec!["/items/1", "/items/:id"]);
    }
}
