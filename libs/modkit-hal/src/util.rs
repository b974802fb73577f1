//! Link helpers for code outside a response: building hrefs on the server side and
//! reading links out of HAL bodies on the client side.

use serde_json::Value;

use crate::link::{Link, LinkOverrides, Params};
use crate::registry::RelationRegistry;
use crate::rel::Rel;
use crate::response::resolve_links;
use crate::service::ServiceHandle;
use crate::template::apply_template;

/// Every link `service` would publish for `rel`, without building a document.
#[must_use]
pub fn links(
    registry: &RelationRegistry,
    service: ServiceHandle,
    rel: impl Into<Rel>,
    overrides: &LinkOverrides,
) -> Vec<Link> {
    resolve_links(registry, Some(service), &Params::new(), &rel.into(), overrides)
        .into_iter()
        .filter(|resolved| resolved.href.is_some())
        .map(|resolved| resolved.to_link())
        .collect()
}

/// The href `service` would publish for `rel` given `params`, preferring a discoverable route.
#[must_use]
pub fn href(
    registry: &RelationRegistry,
    service: ServiceHandle,
    rel: impl Into<Rel>,
    params: &Params,
) -> Option<String> {
    let links: Vec<Link> = resolve_links(
        registry,
        Some(service),
        params,
        &rel.into(),
        &LinkOverrides::default(),
    )
    .into_iter()
    .filter(|resolved| resolved.href.is_some())
    .map(|resolved| resolved.to_link())
    .collect();

    let preferred = links.iter().position(|l| l.discoverable).unwrap_or(0);
    links.into_iter().nth(preferred).map(|link| link.href)
}

/// Links stored under `rel` in a HAL body, singletons normalized to a one-element list.
///
/// Entries that are not link objects are skipped.
#[must_use]
pub fn links_in(body: &Value, rel: impl Into<Rel>) -> Option<Vec<Link>> {
    let entry = body.get("_links")?.get(rel.into().to_string())?;
    let parse = |value: &Value| serde_json::from_value::<Link>(value.clone()).ok();
    match entry {
        Value::Array(items) => Some(items.iter().filter_map(parse).collect()),
        single => parse(single).map(|link| vec![link]),
    }
}

/// Hrefs stored under `rel` in a HAL body, expanded against `params` when given.
#[must_use]
pub fn hrefs_in(body: &Value, rel: impl Into<Rel>, params: Option<&Params>) -> Option<Vec<String>> {
    let links = links_in(body, rel)?;
    Some(
        links
            .into_iter()
            .map(|link| match params {
                Some(params) => apply_template(&link.href, params),
                None => link.href,
            })
            .collect(),
    )
}
