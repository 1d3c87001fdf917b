//! Demo resources: orders and customers, their link builders and routes.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use modkit_hateoas::{
    HateoasError, Hypermedia, Link, LinkBuilderRegistry, LinkBuilderRegistryBuilder, LinkContext,
    Linkable, Linked, ResourceType,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    Shipped,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: u64,
    pub customer_number: String,
    pub status: OrderStatus,
    pub total_cents: u64,
    #[serde(rename = "_links", default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Linkable for Order {
    fn links_mut(&mut self) -> &mut Vec<Link> {
        &mut self.links
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    pub items: Vec<Order>,
    pub total: usize,
    #[serde(rename = "_links", skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Linkable for OrderPage {
    fn links_mut(&mut self) -> &mut Vec<Link> {
        &mut self.links
    }

    fn cache_identity(&self) -> Option<String> {
        Some(format!("all:{}", self.total))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub number: String,
    pub name: String,
    #[serde(rename = "_links", skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Linkable for Customer {
    fn links_mut(&mut self) -> &mut Vec<Link> {
        &mut self.links
    }

    fn cache_identity(&self) -> Option<String> {
        Some(self.number.clone())
    }
}

fn order_links(order: &Order, ctx: &LinkContext) -> Vec<Link> {
    let id = order.id.to_string();
    let params = [("id", id.as_str())];
    let mut links = vec![
        Link::get(ctx.url_for("/orders/{id}", &params), "self"),
        Link::get(
            ctx.url_for("/customers/{number}", &[("number", order.customer_number.as_str())]),
            "customer",
        ),
    ];
    if order.status == OrderStatus::Open {
        links.push(Link::post(ctx.url_for("/orders/{id}/cancel", &params), "cancel"));
    }
    links
}

fn order_page_links(_page: &OrderPage, ctx: &LinkContext) -> Vec<Link> {
    vec![Link::get(ctx.url_for("/orders", &[]), "self")]
}

fn customer_links(customer: &Customer, ctx: &LinkContext) -> Vec<Link> {
    let number = [("number", customer.number.as_str())];
    vec![
        Link::get(ctx.url_for("/customers/{number}", &number), "self"),
        Link::get(ctx.url_for("/orders", &[]), "orders"),
    ]
}

/// Link builders of every resource the demo serves.
///
/// # Errors
/// Returns `HateoasError::DuplicateBuilder` if a type is registered twice.
pub fn registrations() -> Result<LinkBuilderRegistryBuilder, HateoasError> {
    LinkBuilderRegistry::builder()
        .register::<Order, _>(order_links)?
        .register::<OrderPage, _>(order_page_links)?
        .register::<Customer, _>(customer_links)
}

/// Types the routes below return inside `Linked`.
#[must_use]
pub fn resource_types() -> [ResourceType; 3] {
    [
        ResourceType::of::<Order>(),
        ResourceType::of::<OrderPage>(),
        ResourceType::of::<Customer>(),
    ]
}

/// In-memory data behind the demo routes.
#[derive(Clone, Default)]
pub struct Store {
    orders: Arc<RwLock<BTreeMap<u64, Order>>>,
    customers: Arc<RwLock<BTreeMap<String, Customer>>>,
}

impl Store {
    /// Store pre-filled with a couple of customers and orders.
    #[must_use]
    pub fn seeded() -> Self {
        let store = Self::default();
        for (number, name) in [("C-1001", "Ada Lovelace"), ("C-1002", "Alan Turing")] {
            store.customers.write().insert(
                number.to_owned(),
                Customer {
                    number: number.to_owned(),
                    name: name.to_owned(),
                    links: Vec::new(),
                },
            );
        }
        for (id, customer, status, total_cents) in [
            (1, "C-1001", OrderStatus::Open, 4_200),
            (2, "C-1001", OrderStatus::Shipped, 1_999),
            (3, "C-1002", OrderStatus::Open, 12_500),
        ] {
            store.orders.write().insert(
                id,
                Order {
                    id,
                    customer_number: customer.to_owned(),
                    status,
                    total_cents,
                    links: Vec::new(),
                },
            );
        }
        store
    }
}

fn not_found(what: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("{what} not found")).into_response()
}

async fn list_orders(State(store): State<Store>) -> Linked<OrderPage> {
    let items: Vec<Order> = store.orders.read().values().cloned().collect();
    Linked(OrderPage {
        total: items.len(),
        items,
        links: Vec::new(),
    })
}

async fn get_order(State(store): State<Store>, Path(id): Path<u64>) -> Response {
    match store.orders.read().get(&id) {
        Some(order) => Linked(order.clone()).into_response(),
        None => not_found("order"),
    }
}

async fn cancel_order(State(store): State<Store>, Path(id): Path<u64>) -> Response {
    let mut orders = store.orders.write();
    let Some(order) = orders.get_mut(&id) else {
        return not_found("order");
    };
    if order.status != OrderStatus::Open {
        return (StatusCode::CONFLICT, "only open orders can be cancelled").into_response();
    }
    order.status = OrderStatus::Cancelled;
    tracing::info!(order_id = id, "order cancelled");
    Linked(order.clone()).into_response()
}

async fn get_customer(State(store): State<Store>, Path(number): Path<String>) -> Response {
    match store.customers.read().get(&number) {
        Some(customer) => Linked(customer.clone()).into_response(),
        None => not_found("customer"),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Routes of the demo, each tagged with its group and handler name.
///
/// # Errors
/// Returns `HateoasError::InvalidRouteName` if a route tag is malformed.
pub fn router(hypermedia: &Hypermedia, store: Store) -> Result<Router, HateoasError> {
    let router = Router::new()
        .route(
            "/orders",
            get(list_orders).route_layer(hypermedia.route("orders", "list_orders")?),
        )
        .route(
            "/orders/{id}",
            get(get_order).route_layer(hypermedia.route("orders", "get_order")?),
        )
        .route(
            "/orders/{id}/cancel",
            post(cancel_order).route_layer(hypermedia.route("orders", "cancel_order")?),
        )
        .route(
            "/customers/{number}",
            get(get_customer).route_layer(hypermedia.route("customers", "get_customer")?),
        )
        .route("/health", get(health))
        .with_state(store);
    Ok(router)
}
