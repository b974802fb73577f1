#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end assembly of HAL documents across the fixture services.

mod common;

use common::{ALT_DOCS, TEST_DOCS_TEMPLATE, array, assert_curie, assert_standard_link, single};
use modkit_hal::{LinkOverrides, LinkRelation, discovery};
use serde_json::{Value, json};

fn default_case(fx: &common::Fixture) -> Value {
    let mut doc = common::request("/api/test/default?test=true", &[]).resource(
        &fx.registry,
        fx.test,
        "GET",
        "/default",
    );

    doc.link_with("override", LinkOverrides::new().href("/custom"))
        .link("alt:cross")
        .link_with("template", LinkOverrides::new().param("id", "name"))
        .link_with(
            LinkRelation::Alternate,
            LinkOverrides::new().href("/alternate").array(),
        )
        .link("doesNotExist")
        .link_with("query", LinkOverrides::new().param("value", 0));

    doc.embed("extra", json!({ "hello": "world" })).unwrap();
    doc.embed("child", json!({ "depth": 1 }))
        .unwrap()
        .embed("alt:cross", json!({ "depth": 2 }))
        .unwrap();
    doc.embed("unregistered", json!({ "lost": true })).unwrap();

    doc.extend(json!({ "name": "default" })).unwrap();
    doc.into_value()
}

#[test]
fn handler_defaults_are_linked() {
    let fx = common::fixture();
    let hal = default_case(&fx);
    let links = &hal["_links"];

    assert_eq!(single(links, "self")["href"], "/api/test/default?test=true");
    assert_standard_link(&hal, "test", "mixed");
    assert_standard_link(&hal, "test", "middleware");
    assert_standard_link(&hal, "test", "NoHalBehavior");
    assert_eq!(single(links, "index")["href"], "/api/test/index");
    assert!(links.get("test:index").is_none());
}

#[test]
fn curies_are_emitted_once_in_first_use_order() {
    let fx = common::fixture();
    let hal = default_case(&fx);

    assert_eq!(array(&hal["_links"], "curies").len(), 2);
    assert_curie(&hal, 0, "test", TEST_DOCS_TEMPLATE);
    assert_curie(&hal, 1, "alt", ALT_DOCS);
}

#[test]
fn routes_of_one_relation_group_into_an_array() {
    let fx = common::fixture();
    let hal = default_case(&fx);

    let duplicate = array(&hal["_links"], "test:duplicate");
    assert_eq!(
        duplicate,
        &vec![
            json!({ "href": "/api/test/duplicate" }),
            json!({ "href": "/api/test/distinct" }),
        ]
    );
}

#[test]
fn repeated_links_accumulate() {
    let fx = common::fixture();
    let hal = default_case(&fx);

    let template = array(&hal["_links"], "test:template");
    assert_eq!(
        template,
        &vec![
            json!({ "href": "/api/test/template/{id}", "templated": true }),
            json!({ "href": "/api/test/template/name", "name": "name" }),
        ]
    );
}

#[test]
fn overrides_shape_the_published_link() {
    let fx = common::fixture();
    let hal = default_case(&fx);
    let links = &hal["_links"];

    assert_eq!(single(links, "test:override")["href"], "/custom");
    assert_eq!(
        array(links, "alternate"),
        &vec![json!({ "href": "/alternate" })]
    );
    assert_eq!(
        single(links, "test:query"),
        &json!({ "href": "/api/test/query/{param}?q=0", "templated": true })
    );
    assert_eq!(single(links, "alt:cross")["href"], "/api/alt/cross");
}

#[test]
fn unresolved_links_are_left_out() {
    let fx = common::fixture();
    let hal = default_case(&fx);
    assert!(hal["_links"].get("test:doesNotExist").is_none());
}

#[test]
fn unregistered_embeds_keep_their_body_without_links() {
    let fx = common::fixture();
    let hal = default_case(&fx);

    assert_eq!(
        single(&hal["_embedded"], "test:unregistered"),
        &json!({ "lost": true })
    );
    assert!(hal.get("lost").is_none());
}

#[test]
fn embedded_resources_carry_their_own_defaults() {
    let fx = common::fixture();
    let hal = default_case(&fx);

    let extra = single(&hal["_embedded"], "test:extra");
    assert_eq!(
        extra,
        &json!({
            "_links": {
                "self": { "href": "/api/test/extra" },
                "test:default": { "href": "/api/test/default" }
            },
            "hello": "world"
        })
    );
}

#[test]
fn nested_embeds_resolve_across_services() {
    let fx = common::fixture();
    let hal = default_case(&fx);

    let child = single(&hal["_embedded"], "test:child");
    assert_eq!(child["depth"], 1);
    assert_eq!(single(&child["_links"], "self")["href"], "/api/test/child");
    assert_eq!(single(&child["_links"], "alt:cross")["href"], "/api/alt/cross");
    assert!(child["_links"].get("curies").is_none());

    let grandchild = single(&child["_embedded"], "alt:cross");
    assert_eq!(grandchild["depth"], 2);
    assert_eq!(
        grandchild["_links"],
        json!({
            "self": { "href": "/api/alt/cross" },
            "test:default": { "href": "/api/test/default" }
        })
    );
}

#[test]
fn body_fields_sit_next_to_links() {
    let fx = common::fixture();
    let hal = default_case(&fx);
    assert_eq!(hal["name"], "default");
}

#[test]
fn cross_service_defaults_use_the_owner_namespace() {
    let fx = common::fixture();
    let hal = common::request("/api/alt/cross", &[])
        .resource(&fx.registry, fx.alt, "GET", "/cross")
        .into_value();

    assert_eq!(
        hal,
        json!({
            "_links": {
                "self": { "href": "/api/alt/cross" },
                "test:default": { "href": "/api/test/default" },
                "curies": [
                    { "href": TEST_DOCS_TEMPLATE, "templated": true, "name": "test" }
                ]
            }
        })
    );
}

#[test]
fn routes_without_a_relation_still_get_defaults() {
    let fx = common::fixture();
    let hal = common::request("/api/test/fallthrough/5", &[("id", "5")])
        .resource(&fx.registry, fx.test, "GET", "/fallthrough/:id")
        .into_value();

    assert!(hal["_links"].get("self").is_none());
    assert_eq!(
        single(&hal["_links"], "test:template"),
        &json!({ "href": "/api/test/template/5", "name": "5" })
    );
}

#[test]
fn inherited_namespaces_become_the_default() {
    let fx = common::fixture();
    let hal = common::request("/api/dynamic/handler", &[])
        .resource(&fx.registry, fx.dynamic, "GET", "/handler")
        .into_value();
    let links = &hal["_links"];

    assert_eq!(single(links, "self")["href"], "/api/dynamic/handler");
    assert_eq!(single(links, "test:default")["href"], "/api/test/default");
    assert_eq!(single(links, "parent:inherited")["href"], "/api/dynamic/inherited");
    assert_curie(&hal, 0, "test", TEST_DOCS_TEMPLATE);
    assert_curie(&hal, 1, "parent", "/api/dynamic/docs/parent/{rel}");
}

#[test]
fn discovery_lists_discoverable_relations_of_every_service() {
    let fx = common::fixture();
    let hal = discovery(&fx.registry, "/api").into_value();

    assert_eq!(
        hal,
        json!({
            "_links": {
                "self": { "href": "/api" },
                "test:default": { "href": "/api/test/default" },
                "alt:cross": { "href": "/api/alt/cross" },
                "curies": [
                    { "href": TEST_DOCS_TEMPLATE, "templated": true, "name": "test" },
                    { "href": ALT_DOCS, "templated": true, "name": "alt" }
                ]
            }
        })
    );
}
