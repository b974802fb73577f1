//! Root discovery document listing every relation registered as discoverable.

use crate::link::{LinkOverrides, Params};
use crate::registry::RelationRegistry;
use crate::rel::{LinkRelation, Rel};
use crate::response::HalResource;

/// Build the discovery document served at `request_path`.
///
/// Every discoverable relation of every namespaced service is linked once, bound to the
/// service that registered it. A relation may also resolve to routes that are not
/// discoverable, so the links are filtered afterwards: only `self` and links traced to a
/// discoverable registration remain, together with the curies they still reference.
#[must_use]
pub fn discovery<'r>(registry: &'r RelationRegistry, request_path: &str) -> HalResource<'r> {
    let self_rel = Rel::Known(LinkRelation::SelfRel);
    let mut doc = registry.create(None, request_path, &[self_rel], Params::new());

    for service in registry.list_services() {
        for rel in registry.discoverable_relations(service) {
            doc.link_with(rel, LinkOverrides::new().service(service));
        }
    }

    let self_name = LinkRelation::SelfRel.as_str();
    doc.retain_links(|rel, link| rel == self_name || link.discoverable);

    let namespaces: Vec<String> = doc
        .link_relations()
        .filter_map(|rel| rel.split_once(':').map(|(ns, _)| ns.to_owned()))
        .collect();
    doc.context().retain_curies(|curie| {
        curie
            .name
            .as_ref()
            .is_some_and(|name| namespaces.contains(name))
    });

    tracing::debug!(
        links = doc.link_relations().count(),
        "Assembled discovery document"
    );
    doc
}
