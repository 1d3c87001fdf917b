#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Hypermedia (HATEOAS) links for `ModKit` REST resources.
//!
//! Handlers return their resources wrapped in [`Linked`]. A per-route
//! [`HypermediaLayer`] decides, from the directives declared for the route
//! and the request's `Accept` header, whether links are generated; the
//! [`LinkBuilderRegistry`] runs the type's [`LinkBuilder`] or serves the links
//! from a [`LinkCache`].
//!
//! - Policies: `always`, `on_demand` (client sends an `Accept` mentioning
//!   `hateoas`) and `never`, declared globally, per group or per handler; the
//!   most specific directive wins.
//! - Cache keys have the shape `{group}:{handler}:{Type}:{identity}`.
//! - Failures become RFC 9457 `application/problem+json` responses.
//!
//! # Example
//!
//! ```
//! use axum::{Router, routing::get};
//! use modkit_hateoas::{
//!     Hypermedia, HypermediaConfig, Link, LinkBuilderRegistry, LinkContext, Linkable, Linked,
//! };
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Order {
//!     id: String,
//!     #[serde(rename = "_links", skip_serializing_if = "Vec::is_empty")]
//!     links: Vec<Link>,
//! }
//!
//! impl Linkable for Order {
//!     fn links_mut(&mut self) -> &mut Vec<Link> {
//!         &mut self.links
//!     }
//! }
//!
//! let registrations = LinkBuilderRegistry::builder().register::<Order, _>(
//!     |order: &Order, ctx: &LinkContext| {
//!         vec![Link::get(ctx.url_for("/orders/{id}", &[("id", order.id.as_str())]), "self")]
//!     },
//! )?;
//! let hypermedia = Hypermedia::from_config(&HypermediaConfig::default(), registrations)?;
//!
//! let app: Router = Router::new().route(
//!     "/orders/{id}",
//!     get(|| async { Linked(Order { id: "42".to_owned(), links: Vec::new() }) })
//!         .route_layer(hypermedia.route("orders", "get_order")?),
//! );
//! # Ok::<(), modkit_hateoas::HateoasError>(())
//! ```

pub mod cache;
pub mod config;
mod context;
pub mod directive;
pub mod error;
mod hypermedia;
pub mod identity;
pub mod interceptor;
mod layer;
mod link;
mod negotiation;
pub mod registry;
pub mod schema;

pub use cache::{InMemoryLinkCache, LinkCache};
pub use config::{CacheConfig, DirectiveConfig, HypermediaConfig};
pub use context::{LinkContext, RouteId, accept_header};
pub use directive::{Directive, DirectiveTable, Policy, Scope, ScopeResolver};
pub use error::{APPLICATION_PROBLEM_JSON, HateoasError};
pub use hypermedia::Hypermedia;
pub use identity::{CacheKeyResolver, IdentitySource};
pub use interceptor::{InterceptState, ResponseInterceptor, SkipReason};
pub use layer::{HypermediaLayer, HypermediaService, Linked};
pub use link::{Link, LinkBuilder, Linkable};
pub use negotiation::{HATEOAS_TOKEN, accepts_hateoas};
pub use registry::{LinkBuilderRegistry, LinkBuilderRegistryBuilder, ResourceType};
pub use schema::{LINKS_PROPERTY, LinksSchema, add_links_property, links_property};
