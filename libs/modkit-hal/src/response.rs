//! Response Assembler: builds one HAL document per request.
//!
//! A document is a tree of [`HalResource`] nodes. Every node of one tree shares a
//! [`DocumentContext`], which collects the compact URIs (`curies`) emitted for it so each
//! namespace appears once, on the root, no matter how deeply resources are embedded.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::HalError;
use crate::link::{Link, LinkOverrides, Params, ResolvedLink};
use crate::registry::RelationRegistry;
use crate::rel::{CURIES, REL_PARAM, Rel};
use crate::service::ServiceHandle;
use crate::template::apply_template;

const LINKS: &str = "_links";
const EMBEDDED: &str = "_embedded";

/// State shared by all nodes of one document.
///
/// Cloning yields another handle to the same state. The context is deliberately not
/// `Send`: it belongs to the single request building the document.
#[derive(Debug, Clone, Default)]
pub struct DocumentContext {
    curies: Rc<RefCell<Vec<Link>>>,
}

impl DocumentContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once a compact URI for `namespace` has been emitted.
    #[must_use]
    pub fn has_curie(&self, namespace: &str) -> bool {
        self.curies
            .borrow()
            .iter()
            .any(|c| c.name.as_deref() == Some(namespace))
    }

    /// Compact URIs emitted so far, in emission order.
    #[must_use]
    pub fn curies(&self) -> Vec<Link> {
        self.curies.borrow().clone()
    }

    /// Record `curie` unless its namespace already has one.
    fn record_curie(&self, curie: Link) -> bool {
        if curie.name.as_deref().is_some_and(|name| self.has_curie(name)) {
            return false;
        }
        self.curies.borrow_mut().push(curie);
        true
    }

    pub(crate) fn retain_curies(&self, keep: impl FnMut(&Link) -> bool) {
        self.curies.borrow_mut().retain(keep);
    }
}

/// Entries stored under one relation: rendered as an object when there is exactly one,
/// unless array form was requested.
#[derive(Debug, Clone)]
struct Grouped<T> {
    rel: String,
    items: Vec<T>,
    array: bool,
}

fn push_grouped<T>(groups: &mut Vec<Grouped<T>>, rel: &str, item: T, array: bool) {
    match groups.iter_mut().find(|g| g.rel == rel) {
        Some(group) => {
            group.items.push(item);
            group.array |= array;
        }
        None => groups.push(Grouped {
            rel: rel.to_owned(),
            items: vec![item],
            array,
        }),
    }
}

fn grouped_value<T>(group: &Grouped<T>, to_value: impl Fn(&T) -> Value) -> Value {
    match group.items.as_slice() {
        [single] if !group.array => to_value(single),
        items => Value::Array(items.iter().map(to_value).collect()),
    }
}

/// Resolve `rel` into one entry per matching route, with `overrides` applied.
///
/// When nothing is registered a single empty match is used, so overrides such as an
/// explicit `href` still produce a link.
pub(crate) fn resolve_links(
    registry: &RelationRegistry,
    service: Option<ServiceHandle>,
    params: &Params,
    rel: &Rel,
    overrides: &LinkOverrides,
) -> Vec<ResolvedLink> {
    let service = overrides.service.or(service);
    let matches = registry.get_links(service, rel);
    let synthetic = matches.is_empty();
    let matches = if synthetic {
        vec![ResolvedLink::default()]
    } else {
        matches
    };

    matches
        .into_iter()
        .map(|found| {
            let service = found.service.or(service);
            // an explicit relation is final and bypasses namespacing
            let rel = match &overrides.relation {
                Some(relation) => registry.normalize(None, relation),
                None if synthetic => registry.normalize(service, rel),
                None => found.rel,
            };
            let params = match &overrides.params {
                Some(params) => params.clone(),
                None => {
                    let mut merged = params.clone();
                    merged.extend(found.params);
                    merged
                }
            };
            let mut resolved = ResolvedLink {
                service,
                rel,
                href: overrides.href.clone().or(found.href),
                verbs: found.verbs,
                links: overrides.links.clone().unwrap_or(found.links),
                id: overrides.id.clone().or(found.id),
                title: overrides.title.clone().or(found.title),
                params,
                array: overrides.array || found.array,
                discoverable: found.discoverable,
            };
            resolved.resolve_id();
            resolved
        })
        .collect()
}

/// One node of a HAL document.
pub struct HalResource<'r> {
    registry: &'r RelationRegistry,
    context: DocumentContext,
    service: Option<ServiceHandle>,
    params: Params,
    root: bool,
    body: Map<String, Value>,
    links: Vec<Grouped<Link>>,
    embedded: Vec<Grouped<HalResource<'r>>>,
    /// Children whose relation could not be resolved; never serialized
    detached: Vec<HalResource<'r>>,
}

impl std::fmt::Debug for HalResource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HalResource")
            .field("service", &self.service)
            .field("params", &self.params)
            .field("root", &self.root)
            .field("body", &self.body)
            .field("links", &self.links)
            .field("embedded", &self.embedded)
            .finish_non_exhaustive()
    }
}

impl<'r> HalResource<'r> {
    fn node(
        registry: &'r RelationRegistry,
        context: DocumentContext,
        service: Option<ServiceHandle>,
        params: Params,
        root: bool,
    ) -> Self {
        Self {
            registry,
            context,
            service,
            params,
            root,
            body: Map::new(),
            links: Vec::new(),
            embedded: Vec::new(),
            detached: Vec::new(),
        }
    }

    /// Root node of a fresh document. See [`RelationRegistry::create`].
    #[must_use]
    pub fn create(
        registry: &'r RelationRegistry,
        service: Option<ServiceHandle>,
        request_path: &str,
        defaults: &[Rel],
        params: Params,
    ) -> Self {
        let mut root = Self::node(registry, DocumentContext::new(), service, params, true);
        for rel in defaults {
            if rel.is_self() {
                // the request path is concrete; colons and braces in it are not placeholders
                let link = Link {
                    templated: false,
                    ..Link::new(request_path)
                };
                root.add_link(rel, link, false);
            } else {
                root.link(rel);
            }
        }
        root
    }

    #[must_use]
    pub fn context(&self) -> &DocumentContext {
        &self.context
    }

    #[must_use]
    pub fn service(&self) -> Option<ServiceHandle> {
        self.service
    }

    /// Parameters links of this node are resolved against.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Link every route registered for `rel`.
    pub fn link(&mut self, rel: impl Into<Rel>) -> &mut Self {
        self.link_with(rel, LinkOverrides::default())
    }

    /// Link `rel` with caller-supplied overrides.
    ///
    /// A relation that resolves to nothing linkable is logged and skipped.
    pub fn link_with(&mut self, rel: impl Into<Rel>, overrides: LinkOverrides) -> &mut Self {
        let rel = rel.into();
        for resolved in resolve_links(self.registry, self.service, &self.params, &rel, &overrides) {
            if resolved.rel.is_empty() || resolved.href.is_none() {
                tracing::warn!(
                    rel = %self.registry.normalize(self.service, &rel),
                    "Cannot find link relation"
                );
                continue;
            }
            self.docs_for(&resolved);
            let link = resolved.to_link();
            push_grouped(&mut self.links, &resolved.rel, link, resolved.array);
        }
        self
    }

    /// Embed `value` under `rel` and return the embedded node.
    ///
    /// # Errors
    /// Returns [`HalError::Body`] if `value` cannot be serialized and
    /// [`HalError::NonObjectBody`] if it is not a JSON object.
    pub fn embed<T: Serialize>(
        &mut self,
        rel: impl Into<Rel>,
        value: T,
    ) -> Result<&mut HalResource<'r>, HalError> {
        self.embed_with(rel, value, LinkOverrides::default())
    }

    /// Embed `value` under `rel` with caller-supplied overrides.
    ///
    /// Only the first matching route is used. The embedded node inherits the resolved
    /// parameters and starts out with the default relations of that route. When `rel`
    /// cannot be resolved the node is still returned but is not attached to this one.
    ///
    /// # Errors
    /// Returns [`HalError::Body`] if `value` cannot be serialized and
    /// [`HalError::NonObjectBody`] if it is not a JSON object.
    pub fn embed_with<T: Serialize>(
        &mut self,
        rel: impl Into<Rel>,
        value: T,
        overrides: LinkOverrides,
    ) -> Result<&mut HalResource<'r>, HalError> {
        let body = into_body(value)?;
        let rel = rel.into();
        let resolved = resolve_links(self.registry, self.service, &self.params, &rel, &overrides)
            .into_iter()
            .next()
            .unwrap_or_default();

        if resolved.rel.is_empty() {
            tracing::warn!(rel = %rel, "Cannot find embedded relation");
            let mut child = Self::node(
                self.registry,
                self.context.clone(),
                overrides.service.or(self.service),
                overrides.params.unwrap_or_else(|| self.params.clone()),
                false,
            );
            child.body = body;
            self.detached.push(child);
            let last = self.detached.len() - 1;
            return Ok(&mut self.detached[last]);
        }

        let mut child = Self::node(
            self.registry,
            self.context.clone(),
            resolved.service,
            resolved.params.clone(),
            false,
        );
        child.body = body;
        child.initialize(&resolved);
        self.docs_for(&resolved);

        let group = match self.embedded.iter().position(|g| g.rel == resolved.rel) {
            Some(pos) => {
                let group = &mut self.embedded[pos];
                group.items.push(child);
                group.array |= resolved.array;
                group
            }
            None => {
                self.embedded.push(Grouped {
                    rel: resolved.rel.clone(),
                    items: vec![child],
                    array: resolved.array,
                });
                let last = self.embedded.len() - 1;
                &mut self.embedded[last]
            }
        };
        let last = group.items.len() - 1;
        Ok(&mut group.items[last])
    }

    /// Default relations of an embedded node.
    fn initialize(&mut self, resolved: &ResolvedLink) {
        for rel in &resolved.links {
            if rel.is_self() {
                if resolved.href.is_some() {
                    self.add_link(rel, resolved.to_link(), false);
                }
            } else {
                self.link(rel);
            }
        }
    }

    fn add_link(&mut self, rel: &Rel, link: Link, array: bool) {
        let rel = self.registry.normalize(None, rel);
        push_grouped(&mut self.links, &rel, link, array);
    }

    fn docs_for(&self, resolved: &ResolvedLink) {
        if let Some(docs) = self
            .registry
            .docs_for_normalized(resolved.service, &resolved.rel)
        {
            self.docs(&docs.name, &docs.href);
        }
    }

    /// Emit a compact URI for `namespace` on the root of this document, once.
    ///
    /// The relation parameter is left out when expanding `href`, so the entry stays templated.
    pub fn docs(&self, namespace: &str, href: &str) {
        if self.context.has_curie(namespace) {
            return;
        }
        let mut params = self.params.clone();
        params.remove(REL_PARAM);
        let curie = Link::new(apply_template(href, &params)).with_name(namespace);
        self.context.record_curie(curie);
    }

    /// Set one body field. The reserved `_links` and `_embedded` keys are ignored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        if is_reserved(&key) {
            tracing::debug!(%key, "Ignoring reserved key in resource body");
        } else {
            self.body.insert(key, value.into());
        }
        self
    }

    /// Merge the fields of `value` into the body.
    ///
    /// # Errors
    /// Returns [`HalError::Body`] if `value` cannot be serialized and
    /// [`HalError::NonObjectBody`] if it is not a JSON object.
    pub fn extend<T: Serialize>(&mut self, value: T) -> Result<&mut Self, HalError> {
        for (key, value) in into_body(value)? {
            self.insert(key, value);
        }
        Ok(self)
    }

    /// Links currently stored under the normalized relation `rel`.
    #[must_use]
    pub fn links(&self, rel: &str) -> Option<&[Link]> {
        self.links
            .iter()
            .find(|g| g.rel == rel)
            .map(|g| g.items.as_slice())
    }

    /// Resources currently embedded under the normalized relation `rel`.
    #[must_use]
    pub fn embedded(&self, rel: &str) -> Option<&[HalResource<'r>]> {
        self.embedded
            .iter()
            .find(|g| g.rel == rel)
            .map(|g| g.items.as_slice())
    }

    /// Keep only the links for which `keep(rel, link)` holds.
    pub fn retain_links(&mut self, mut keep: impl FnMut(&str, &Link) -> bool) {
        for group in &mut self.links {
            group.items.retain(|link| keep(&group.rel, link));
        }
        self.links.retain(|g| !g.items.is_empty());
    }

    /// Relations this node currently links, in insertion order.
    pub fn link_relations(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|g| g.rel.as_str())
    }

    /// Render the node as `{ _links, _embedded, ...body }`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();

        let mut links = Map::new();
        for group in &self.links {
            links.insert(group.rel.clone(), grouped_value(group, link_value));
        }
        if self.root {
            let curies = self.context.curies();
            if !curies.is_empty() {
                links.insert(
                    CURIES.to_owned(),
                    Value::Array(curies.iter().map(link_value).collect()),
                );
            }
        }
        if !links.is_empty() {
            out.insert(LINKS.to_owned(), Value::Object(links));
        }

        if !self.embedded.is_empty() {
            let embedded = self
                .embedded
                .iter()
                .map(|group| (group.rel.clone(), grouped_value(group, HalResource::to_value)))
                .collect();
            out.insert(EMBEDDED.to_owned(), Value::Object(embedded));
        }

        for (key, value) in &self.body {
            out.insert(key.clone(), value.clone());
        }
        Value::Object(out)
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.to_value()
    }
}

impl Serialize for HalResource<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

fn link_value(link: &Link) -> Value {
    serde_json::to_value(link).unwrap_or(Value::Null)
}

fn is_reserved(key: &str) -> bool {
    key == LINKS || key == EMBEDDED
}

fn into_body<T: Serialize>(value: T) -> Result<Map<String, Value>, HalError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .filter(|(key, _)| !is_reserved(key))
            .collect()),
        Value::Null => Ok(Map::new()),
        other => Err(HalError::NonObjectBody {
            kind: json_kind(&other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
