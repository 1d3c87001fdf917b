//! axum glue: the [`Linked`] response wrapper and the per-route tower layer.
//!
//! A handler returns `Linked(resource)`. The wrapper renders the plain JSON
//! body right away and parks the typed resource in the response extensions.
//! [`HypermediaLayer`], attached to the route, picks it up, lets the
//! interceptor decide and re-renders the body with links when generation ran.
//! Without the layer the response is served as plain JSON.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use axum::Json;
use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;
use tower::{Layer, Service};

use crate::context::{LinkContext, RouteId};
use crate::error::HateoasError;
use crate::hypermedia::Hypermedia;
use crate::interceptor::ResponseInterceptor;
use crate::link::Linkable;
use crate::registry::LinkBuilderRegistry;

/// Response wrapper marking a handler result as linkable.
///
/// ```
/// use axum::response::IntoResponse;
/// use modkit_hateoas::{Link, Linkable, Linked};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Order {
///     id: u64,
///     #[serde(rename = "_links", skip_serializing_if = "Vec::is_empty")]
///     links: Vec<Link>,
/// }
///
/// impl Linkable for Order {
///     fn links_mut(&mut self) -> &mut Vec<Link> {
///         &mut self.links
///     }
/// }
///
/// async fn get_order() -> impl IntoResponse {
///     Linked(Order { id: 42, links: Vec::new() })
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Linked<T>(pub T);

impl<T: Linkable> IntoResponse for Linked<T> {
    fn into_response(self) -> Response {
        let mut response = Json(&self.0).into_response();
        if response.status().is_success() {
            response
                .extensions_mut()
                .insert(PendingResource::new(self.0));
        }
        response
    }
}

/// Type-erased resource waiting for its links.
#[async_trait]
pub trait PendingLinks: Send {
    /// Run the interceptor on the resource and serialize the result.
    async fn render(
        self: Box<Self>,
        registry: &LinkBuilderRegistry,
        ctx: &LinkContext,
        interceptor: &mut ResponseInterceptor<'_>,
    ) -> Result<Vec<u8>, HateoasError>;
}

struct Pending<T>(T);

#[async_trait]
impl<T: Linkable> PendingLinks for Pending<T> {
    async fn render(
        self: Box<Self>,
        registry: &LinkBuilderRegistry,
        ctx: &LinkContext,
        interceptor: &mut ResponseInterceptor<'_>,
    ) -> Result<Vec<u8>, HateoasError> {
        let mut resource = self.0;
        interceptor.intercept(registry, ctx, &mut resource).await?;
        serde_json::to_vec(&resource).map_err(HateoasError::Render)
    }
}

type Slot = Mutex<Option<Box<dyn PendingLinks>>>;

/// Extension slot; the first layer to see it takes the resource out.
#[derive(Clone)]
pub struct PendingResource(Arc<Slot>);

impl PendingResource {
    fn new<T: Linkable>(resource: T) -> Self {
        Self(Arc::new(Mutex::new(Some(Box::new(Pending(resource))))))
    }

    /// Remove the pending resource from `response`, if any.
    pub fn take(response: &mut Response) -> Option<Box<dyn PendingLinks>> {
        response
            .extensions_mut()
            .remove::<Self>()
            .and_then(|slot| slot.0.lock().take())
    }
}

/// Tower layer applying hypermedia links to one route's responses.
#[derive(Clone)]
pub struct HypermediaLayer {
    hypermedia: Hypermedia,
    route: RouteId,
}

impl HypermediaLayer {
    #[must_use]
    pub fn new(hypermedia: Hypermedia, route: RouteId) -> Self {
        Self { hypermedia, route }
    }
}

impl<S> Layer<S> for HypermediaLayer {
    type Service = HypermediaService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HypermediaService {
            inner,
            hypermedia: self.hypermedia.clone(),
            route: self.route.clone(),
        }
    }
}

#[derive(Clone)]
pub struct HypermediaService<S> {
    inner: S,
    hypermedia: Hypermedia,
    route: RouteId,
}

impl<S> Service<Request<Body>> for HypermediaService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let (parts, body) = req.into_parts();
        let ctx = LinkContext::from_parts(
            &parts,
            self.route.clone(),
            self.hypermedia.public_base_url(),
        );
        let req = Request::from_parts(parts, body);

        let hypermedia = self.hypermedia.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let response = inner.call(req).await?;
            Ok(hypermedia.apply(&ctx, response).await)
        })
    }
}
