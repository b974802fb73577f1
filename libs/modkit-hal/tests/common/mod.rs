#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Shared fixture: three services wired into one registry.
//!
//! - `test` at `/api/test`, namespace `test` documented off-site
//! - `alt` at `/api/alt`, namespaces `alt` and `secondary` (auto-documented), linking back into `test`
//! - `dynamic` at `/api/dynamic`, inheriting the `parent` namespace from another declaration

use http::Method;
use modkit_hal::{
    HalRequest, LinkRelation, NamespaceOptions, Params, Rel, RelOptions, RelationRegistry,
    ServiceDecl, ServiceHandle,
};
use serde_json::Value;

pub const TEST_DOCS_TEMPLATE: &str = "http://www.contoso.com/docs/{rel}";
pub const ALT_DOCS: &str = "http://www.adatum.com/docs/{rel}";

pub struct Fixture {
    pub registry: RelationRegistry,
    pub test: ServiceHandle,
    pub alt: ServiceHandle,
    pub dynamic: ServiceHandle,
}

fn test_service() -> ServiceDecl {
    let mut test = ServiceDecl::new("test").base_path("/api/test");
    test.declare_namespace(
        "test",
        NamespaceOptions::new().docs_href("http://www.contoso.com/docs/:rel"),
    );

    test.declare_route(Method::GET, "/default")
        .provides("default", RelOptions::new().discoverable())
        .hal_links([
            Rel::from("mixed"),
            Rel::from("middleware"),
            Rel::from("NoHalBehavior"),
            Rel::from(LinkRelation::Index),
            Rel::from("template"),
            Rel::from("duplicate"),
        ]);
    test.declare_route(Method::POST, "/mixed")
        .provides("mixed", RelOptions::new())
        .hal("default");
    test.declare_route(Method::PUT, "/middleware")
        .provides("middleware", RelOptions::new())
        .hal("default");
    test.declare_route(Method::DELETE, "/NoHalBehavior")
        .provides("NoHalBehavior", RelOptions::new());
    test.declare_route(Method::GET, "/index")
        .provides(LinkRelation::Index, RelOptions::new());
    test.declare_route(Method::GET, "/extra")
        .provides("extra", RelOptions::new())
        .hal("default");
    test.declare_route(Method::GET, "/override")
        .provides("override", RelOptions::new());
    test.declare_route(Method::GET, "/template/:id")
        .provides("template", RelOptions::new().id("id"));
    test.declare_route(Method::GET, "/duplicate")
        .provides("duplicate", RelOptions::new());
    test.declare_route(Method::PUT, "/duplicate")
        .provides("duplicate", RelOptions::new());
    test.declare_route(Method::GET, "/distinct")
        .provides("duplicate", RelOptions::new());
    test.declare_route(Method::GET, "/fallthrough/:id")
        .hal("template")
        .self_link(false);
    test.declare_route(Method::GET, "/child")
        .provides("child", RelOptions::new())
        .hal("alt:cross");
    test.declare_route(Method::GET, "/query/{param}?q={value}")
        .provides("query", RelOptions::new());
    test
}

fn alt_service() -> ServiceDecl {
    let mut alt = ServiceDecl::new("alt").base_path("/api/alt");
    alt.declare_namespace("alt", NamespaceOptions::new().docs_href(ALT_DOCS))
        .declare_namespace("secondary", NamespaceOptions::new());
    alt.declare_route(Method::GET, "/cross")
        .provides("cross", RelOptions::new().discoverable())
        .hal("test:default");
    alt.declare_route(Method::GET, "/things/:id")
        .provides(
            "secondary:thing",
            RelOptions::new().id("id").description("Fetch one thing"),
        );
    alt
}

fn dynamic_service() -> ServiceDecl {
    let mut parent = ServiceDecl::new("parent");
    parent.declare_namespace("parent", NamespaceOptions::new());

    let mut dynamic = ServiceDecl::new("dynamic").base_path("/api/dynamic");
    dynamic.inherit(&parent);
    dynamic
        .declare_route(Method::GET, "/handler")
        .hal("test:default")
        .hal("parent:inherited");
    dynamic
        .declare_route(Method::GET, "/inherited")
        .provides("inherited", RelOptions::new());
    dynamic
}

pub fn fixture() -> Fixture {
    let mut registry = RelationRegistry::new();
    let test = registry.install(test_service());
    let alt = registry.install(alt_service());
    let dynamic = registry.install(dynamic_service());
    Fixture {
        registry,
        test,
        alt,
        dynamic,
    }
}

pub fn request(path: &str, params: &[(&str, &str)]) -> HalRequest {
    let params: Params = params
        .iter()
        .map(|(k, v)| ((*k).to_owned(), Value::String((*v).to_owned())))
        .collect();
    HalRequest {
        path: path.to_owned(),
        params,
    }
}

/// The single link object stored under `rel`; fails if it is missing or an array.
pub fn single<'a>(map: &'a Value, rel: &str) -> &'a Value {
    let item = map.get(rel).unwrap_or_else(|| panic!("expected {rel} to be present"));
    assert!(item.is_object(), "expected {rel} to not be an array: {item}");
    item
}

/// The array stored under `rel`; fails if it is missing or a singleton.
pub fn array<'a>(map: &'a Value, rel: &str) -> &'a Vec<Value> {
    map.get(rel)
        .and_then(Value::as_array)
        .unwrap_or_else(|| panic!("expected {rel} to be an array"))
}

pub fn assert_standard_link(hal: &Value, ns: &str, rel: &str) {
    assert_eq!(
        single(&hal["_links"], &format!("{ns}:{rel}"))["href"],
        format!("/api/{ns}/{rel}")
    );
}

pub fn assert_curie(hal: &Value, index: usize, ns: &str, href: &str) {
    let curies = array(&hal["_links"], "curies");
    let curie = curies
        .get(index)
        .unwrap_or_else(|| panic!("expected curie #{index}"));
    assert_eq!(curie["name"], ns);
    assert_eq!(curie["href"], href);
    assert_eq!(curie["templated"], true);
}
