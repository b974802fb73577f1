#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! HAL hypermedia support for `ModKit` services
//!
//! Services declare the relations (verbs on resources) they provide, and at
//! request time handlers assemble self-describing `application/hal+json`
//! documents from them:
//! - **Registration**: each service builds a [`ServiceDecl`] and installs it into a
//!   [`RelationRegistry`] once at startup. The registry is read-only afterwards
//!   and is shared behind an `Arc`.
//! - **Resolution**: relations may be namespaced (`catalog:item`) and resolve to
//!   whichever service owns that namespace and relation.
//! - **Assembly**: [`HalResource`] collects links, embedded resources and compact
//!   URIs (`curies`) for a single response.
//!
//! # Example
//!
//! ```
//! use http::Method;
//! use modkit_hal::{LinkRelation, NamespaceOptions, RelOptions, RelationRegistry, ServiceDecl};
//!
//! let mut catalog = ServiceDecl::new("catalog").base_path("/api/catalog");
//! catalog.declare_namespace("catalog", NamespaceOptions::default());
//! catalog
//!     .declare_route(Method::GET, "/items/:id")
//!     .provides("item", RelOptions::new().id("id"));
//!
//! let mut registry = RelationRegistry::new();
//! let service = registry.install(catalog);
//!
//! let mut params = modkit_hal::Params::new();
//! params.insert("id".to_owned(), "42".into());
//! let mut doc = registry.create(Some(service), "/api/catalog", &[LinkRelation::SelfRel.into()], params);
//! doc.link("item");
//!
//! let json = doc.into_value();
//! assert_eq!(json["_links"]["catalog:item"]["href"], "/api/catalog/items/42");
//! assert_eq!(json["_links"]["curies"][0]["name"], "catalog");
//! ```

pub mod discovery;
pub mod docs;
pub mod error;
pub mod link;
pub mod problem;
pub mod registry;
pub mod rel;
pub mod response;
pub mod rest;
pub mod service;
pub mod template;
pub mod util;

pub use discovery::discovery;
pub use docs::{DocumentationRenderer, HtmlRenderer, RelationDocs, RouteDocs, VerbDocs};
pub use error::HalError;
pub use link::{Link, LinkOverrides, Params, ResolvedLink};
pub use problem::{APPLICATION_PROBLEM_JSON, Problem};
pub use registry::{Namespace, NamespaceDocs, RelationRegistry, Resolution};
pub use rel::{CURIES, LinkRelation, REL_PARAM, Rel};
pub use response::{DocumentContext, HalResource};
pub use rest::{APPLICATION_HAL_JSON, HalJson, HalRequest, discovery_router, docs_router};
pub use service::{
    Description, DocsFallback, LinkHook, NamespaceOptions, RelOptions, RouteDecl, ServiceDecl,
    ServiceHandle,
};
