//! Demo catalog service: a handful of items behind HAL endpoints.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use modkit_hal::template::to_axum_path;
use modkit_hal::{
    HalJson, HalRequest, LinkOverrides, LinkRelation, NamespaceOptions, Params, Problem,
    RelOptions, RelationRegistry, ServiceDecl, ServiceHandle,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

pub const BASE_PATH: &str = "/api/catalog";

const ITEMS: &str = "/items";
const ITEM: &str = "/items/:id";
const SEARCH: &str = "/items/search{?q}";

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewItem {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Relations and handlers of the catalog service.
#[must_use]
pub fn declare() -> ServiceDecl {
    let mut catalog = ServiceDecl::new("catalog").base_path(BASE_PATH);
    catalog.declare_namespace(
        "catalog",
        NamespaceOptions::new()
            .fallback(|rel| Some(format!("{rel} is part of the demo catalog"))),
    );

    catalog
        .declare_route("GET", ITEMS)
        .provides(
            "items",
            RelOptions::new()
                .discoverable()
                .title("Items")
                .description("List every item"),
        )
        .provides(LinkRelation::Collection, RelOptions::new())
        .hal("item")
        .hal("search");
    catalog
        .declare_route("POST", ITEMS)
        .provides("items", RelOptions::new().description("Create an item"));
    catalog
        .declare_route("GET", SEARCH)
        .provides(
            "search",
            RelOptions::new()
                .discoverable()
                .description("Find items by name"),
        );
    catalog
        .declare_route("GET", ITEM)
        .provides(
            "item",
            RelOptions::new()
                .id("id")
                .description("Fetch one item")
                .links([LinkRelation::Collection]),
        )
        .hal(LinkRelation::Collection);
    catalog
}

#[derive(Clone)]
pub struct CatalogState {
    registry: Arc<RelationRegistry>,
    service: ServiceHandle,
    items: Arc<RwLock<Vec<Item>>>,
}

impl CatalogState {
    #[must_use]
    pub fn new(registry: Arc<RelationRegistry>, service: ServiceHandle) -> Self {
        let items = ["Widget", "Gadget", "Gizmo"]
            .into_iter()
            .zip(1..)
            .map(|(name, id)| Item {
                id,
                name: name.to_owned(),
            })
            .collect();
        Self {
            registry,
            service,
            items: Arc::new(RwLock::new(items)),
        }
    }
}

/// Routes of the catalog, to be nested under [`BASE_PATH`].
#[must_use]
pub fn router(state: CatalogState) -> Router {
    Router::new()
        .route(&to_axum_path(ITEMS), get(list_items).post(create_item))
        .route(&to_axum_path(SEARCH), get(search_items))
        .route(&to_axum_path(ITEM), get(get_item))
        .with_state(state)
}

fn item_params(item: &Item) -> Params {
    let mut params = Params::new();
    params.insert("id".to_owned(), item.id.into());
    params
}

fn embed_items(
    state: &CatalogState,
    request: &HalRequest,
    route: &str,
    items: &[Item],
) -> HalJson {
    let mut doc = request.resource(&state.registry, state.service, "GET", route);
    for item in items {
        let overrides = LinkOverrides::new().params(item_params(item)).array();
        if let Err(e) = doc.embed_with("item", item, overrides) {
            tracing::warn!(item = item.id, error = %e, "Skipping item");
        }
    }
    doc.insert("count", items.len());
    doc.into()
}

async fn list_items(State(state): State<CatalogState>, request: HalRequest) -> HalJson {
    let items = state.items.read().await.clone();
    embed_items(&state, &request, ITEMS, &items)
}

async fn search_items(
    State(state): State<CatalogState>,
    request: HalRequest,
    Query(query): Query<SearchQuery>,
) -> HalJson {
    let needle = query.q.to_lowercase();
    let items: Vec<Item> = state
        .items
        .read()
        .await
        .iter()
        .filter(|item| item.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    tracing::debug!(q = %query.q, hits = items.len(), "Searched catalog");
    embed_items(&state, &request, SEARCH, &items)
}

fn item_response(state: &CatalogState, request: &HalRequest, item: &Item) -> Response {
    let mut doc = request.resource(&state.registry, state.service, "GET", ITEM);
    if let Err(e) = doc.extend(item) {
        return Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            e.to_string(),
        )
        .with_instance(request.path.clone())
        .into_response();
    }
    HalJson::from(doc).into_response()
}

async fn get_item(State(state): State<CatalogState>, request: HalRequest) -> Response {
    let id = request
        .params
        .get("id")
        .and_then(Value::as_str)
        .and_then(|id| id.parse::<u64>().ok());
    let found = {
        let items = state.items.read().await;
        id.and_then(|id| items.iter().find(|item| item.id == id).cloned())
    };

    match found {
        Some(item) => item_response(&state, &request, &item),
        None => Problem::not_found("No such item", request.path.clone()).into_response(),
    }
}

async fn create_item(
    State(state): State<CatalogState>,
    request: HalRequest,
    axum::Json(new): axum::Json<NewItem>,
) -> Response {
    let item = {
        let mut items = state.items.write().await;
        let id = items.iter().map(|item| item.id).max().unwrap_or(0) + 1;
        let item = Item { id, name: new.name };
        items.push(item.clone());
        item
    };
    tracing::info!(id = item.id, name = %item.name, "Created item");

    // respond as if the new item had been fetched
    let created = HalRequest {
        path: format!("{BASE_PATH}{ITEMS}/{}", item.id),
        params: request
            .params
            .into_iter()
            .chain(item_params(&item))
            .collect(),
    };
    let mut response = item_response(&state, &created, &item);
    if response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::CREATED;
    }
    response
}
