//! Axum glue: the HAL media type, a request extractor and the routers serving the
//! discovery document and generated relation documentation.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::Router;
use axum::extract::{FromRequestParts, OriginalUri, Path, State};
use axum::http::request::Parts;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::Value;

use crate::discovery::discovery;
use crate::docs::DocumentationRenderer;
use crate::link::Params;
use crate::problem::Problem;
use crate::registry::{RelationRegistry, relative_to};
use crate::rel::REL_PARAM;
use crate::response::HalResource;
use crate::service::ServiceHandle;
use crate::template::to_axum_path;

/// Media type of HAL documents.
pub const APPLICATION_HAL_JSON: &str = "application/hal+json";

/// A HAL document response (`application/hal+json`).
#[derive(Debug, Clone)]
pub struct HalJson(pub Value);

impl IntoResponse for HalJson {
    fn into_response(self) -> Response {
        (
            [(header::CONTENT_TYPE, HeaderValue::from_static(APPLICATION_HAL_JSON))],
            axum::Json(self.0),
        )
            .into_response()
    }
}

impl From<HalResource<'_>> for HalJson {
    fn from(resource: HalResource<'_>) -> Self {
        Self(resource.into_value())
    }
}

/// What a HAL handler needs from the request: the path it was called with (including
/// the query and any prefix of enclosing routers) and its path parameters.
#[derive(Debug, Clone, Default)]
pub struct HalRequest {
    pub path: String,
    pub params: Params,
}

impl HalRequest {
    /// Start the response document of the handler declared as `verb` on `route`.
    #[must_use]
    pub fn resource<'r>(
        &self,
        registry: &'r RelationRegistry,
        service: ServiceHandle,
        verb: &str,
        route: &str,
    ) -> HalResource<'r> {
        let defaults = registry.default_links(service, verb, route);
        registry.create(Some(service), &self.path, &defaults, self.params.clone())
    }
}

impl<S> FromRequestParts<S> for HalRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);
        let path = uri
            .path_and_query()
            .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned());

        // routes without parameters reject the extractor; treat that as no parameters
        let params = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map(|Path(params)| {
                params
                    .into_iter()
                    .map(|(name, value)| (name, Value::String(value)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { path, params })
    }
}

/// Serve the discovery document at `path`.
pub fn discovery_router(registry: Arc<RelationRegistry>, path: &str) -> Router {
    Router::new()
        .route(path, get(serve_discovery))
        .with_state(registry)
}

async fn serve_discovery(
    State(registry): State<Arc<RelationRegistry>>,
    request: HalRequest,
) -> HalJson {
    HalJson(discovery(&registry, &request.path).into_value())
}

#[derive(Clone)]
struct DocsState {
    registry: Arc<RelationRegistry>,
    renderer: Arc<dyn DocumentationRenderer>,
    namespace: String,
}

/// Serve generated documentation for every auto-documented namespace whose docs href
/// is local, at that href (relative to the owning service's base path).
pub fn docs_router(
    registry: &Arc<RelationRegistry>,
    renderer: &Arc<dyn DocumentationRenderer>,
) -> Router {
    let mut router = Router::new();
    let mut mounted: Vec<String> = Vec::new();

    for service in registry.list_services() {
        let base_path = registry.base_path(service).unwrap_or_default();
        for namespace in registry.namespaces(service) {
            if !namespace.auto_document || !namespace.docs_href.starts_with('/') {
                continue;
            }
            let path = to_axum_path(&relative_to(base_path, &namespace.docs_href));
            if mounted.contains(&path) {
                tracing::warn!(
                    namespace = %namespace.name,
                    %path,
                    "Documentation path already served; skipping"
                );
                continue;
            }
            tracing::debug!(namespace = %namespace.name, %path, "Serving relation documentation");

            let state = DocsState {
                registry: Arc::clone(registry),
                renderer: Arc::clone(renderer),
                namespace: namespace.name.clone(),
            };
            router = router.route(&path, get(serve_docs).with_state(state));
            mounted.push(path);
        }
    }
    router
}

async fn serve_docs(State(state): State<DocsState>, request: HalRequest) -> Response {
    let rel = request.params.get(REL_PARAM).and_then(Value::as_str);
    let docs = rel.and_then(|rel| state.registry.describe(&state.namespace, rel));

    match docs {
        Some(docs) => (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(state.renderer.content_type()),
            )],
            state.renderer.render(&docs),
        )
            .into_response(),
        None => {
            let detail = format!(
                "No relation '{}:{}' is registered",
                state.namespace,
                rel.unwrap_or_default()
            );
            Problem::not_found(detail, request.path).into_response()
        }
    }
}
