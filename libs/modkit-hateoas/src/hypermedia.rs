//! Application-level entry point bundling registry, directives and settings.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header;
use axum::response::Response;

use crate::cache::InMemoryLinkCache;
use crate::config::HypermediaConfig;
use crate::context::{LinkContext, RouteId};
use crate::directive::DirectiveTable;
use crate::error::HateoasError;
use crate::interceptor::ResponseInterceptor;
use crate::layer::{HypermediaLayer, PendingResource};
use crate::registry::{LinkBuilderRegistry, LinkBuilderRegistryBuilder};

/// Shared hypermedia setup of one application.
///
/// Cheap to clone; every clone sees the same registry and directive table.
#[derive(Clone)]
pub struct Hypermedia {
    registry: Arc<LinkBuilderRegistry>,
    directives: Arc<DirectiveTable>,
    public_base_url: Option<Arc<str>>,
}

impl Hypermedia {
    /// Combine a built registry with the directive table.
    ///
    /// # Errors
    /// Returns `HateoasError::CacheNotConfigured` when a directive enables
    /// caching but the registry has no cache.
    pub fn new(registry: LinkBuilderRegistry, directives: DirectiveTable) -> Result<Self, HateoasError> {
        if directives.requires_cache() && !registry.has_cache() {
            return Err(HateoasError::CacheNotConfigured);
        }
        Ok(Self {
            registry: Arc::new(registry),
            directives: Arc::new(directives),
            public_base_url: None,
        })
    }

    /// Wire the application from configuration in one call.
    ///
    /// The in-memory cache is attached when `cache.enabled` is set, with the
    /// configured TTL and size bound.
    ///
    /// # Errors
    /// Returns `HateoasError::DuplicateDirective` for conflicting directive
    /// entries, `HateoasError::Config` for malformed ones and
    /// `HateoasError::CacheNotConfigured` when caching is requested with the
    /// cache disabled.
    pub fn from_config(
        config: &HypermediaConfig,
        registrations: LinkBuilderRegistryBuilder,
    ) -> Result<Self, HateoasError> {
        let directives = config.directive_table()?;

        let mut registrations = registrations.default_ttl(config.cache.ttl);
        if config.cache.enabled {
            registrations = registrations.cache(Arc::new(InMemoryLinkCache::with_capacity(
                config.cache.max_entries,
            )));
        }

        let mut hypermedia = Self::new(registrations.build(), directives)?;
        if let Some(url) = &config.public_base_url {
            hypermedia.public_base_url = Some(url.as_str().into());
        }
        tracing::debug!(
            resources = ?hypermedia.registry.registered_types(),
            cache = config.cache.enabled,
            "hypermedia configured"
        );
        Ok(hypermedia)
    }

    /// Base URL for generated links, overriding the request `Host`.
    #[must_use]
    pub fn with_public_base_url(mut self, url: impl Into<Arc<str>>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn public_base_url(&self) -> Option<&str> {
        self.public_base_url.as_deref()
    }

    #[must_use]
    pub fn registry(&self) -> &LinkBuilderRegistry {
        &self.registry
    }

    #[must_use]
    pub fn directives(&self) -> &DirectiveTable {
        &self.directives
    }

    /// Layer for responses outside any route group; only a global directive applies.
    #[must_use]
    pub fn layer(&self) -> HypermediaLayer {
        HypermediaLayer::new(self.clone(), RouteId::default())
    }

    /// Layer tagging a route with its group and handler name.
    ///
    /// ```
    /// use axum::{Router, routing::get};
    /// use modkit_hateoas::{DirectiveTable, Hypermedia, LinkBuilderRegistry};
    ///
    /// let hypermedia = Hypermedia::new(LinkBuilderRegistry::builder().build(), DirectiveTable::new())?;
    /// let app: Router = Router::new().route(
    ///     "/health",
    ///     get(|| async { "ok" }).route_layer(hypermedia.route("system", "health")?),
    /// );
    /// # Ok::<(), modkit_hateoas::HateoasError>(())
    /// ```
    ///
    /// # Errors
    /// Returns `HateoasError::InvalidRouteName` if `group` or `handler` contains `:`.
    pub fn route(
        &self,
        group: impl Into<String>,
        handler: impl Into<String>,
    ) -> Result<HypermediaLayer, HateoasError> {
        Ok(HypermediaLayer::new(self.clone(), RouteId::new(group, handler)?))
    }

    /// Apply link generation to a response produced for `ctx`.
    ///
    /// Responses not built from `Linked` pass through unchanged, as do
    /// skipped ones. Generation errors are turned into a problem response.
    pub async fn apply(&self, ctx: &LinkContext, mut response: Response) -> Response {
        let Some(pending) = PendingResource::take(&mut response) else {
            return response;
        };

        let active = self.directives.active_for(ctx.route());
        let mut interceptor = ResponseInterceptor::governing(&active);
        if interceptor
            .decide(ctx.accept(), response.status().is_success())
            .is_none()
        {
            return response;
        }

        match pending.render(&self.registry, ctx, &mut interceptor).await {
            Ok(body) => {
                response.headers_mut().remove(header::CONTENT_LENGTH);
                *response.body_mut() = Body::from(body);
                response
            }
            Err(err) => {
                tracing::warn!(
                    route = ?ctx.route(),
                    path = ctx.path(),
                    error = %err,
                    "link generation failed"
                );
                err.into_problem_response(ctx.path())
            }
        }
    }
}

impl std::fmt::Debug for Hypermedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hypermedia")
            .field("registry", &self.registry)
            .field("directives", &self.directives)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::directive::Policy;
    use crate::layer::Linked;
    use crate::link::{Link, Linkable};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde::Serialize;
    use tracing_test::traced_test;

    #[derive(Serialize)]
    struct Invoice {
        id: u32,
        links: Vec<Link>,
    }

    impl Linkable for Invoice {
        fn links_mut(&mut self) -> &mut Vec<Link> {
            &mut self.links
        }
    }

    #[test]
    fn caching_directive_without_cache_fails_fast() {
        let table = DirectiveTable::new()
            .with_group("orders", Policy::OnDemand, true)
            .unwrap();
        let err = Hypermedia::new(LinkBuilderRegistry::builder().build(), table).unwrap_err();
        assert!(matches!(err, HateoasError::CacheNotConfigured));
    }

    #[test]
    fn from_config_attaches_cache_when_enabled() {
        let mut config = HypermediaConfig {
            caching: true,
            ..HypermediaConfig::default()
        };
        let err = Hypermedia::from_config(&config, LinkBuilderRegistry::builder()).unwrap_err();
        assert!(matches!(err, HateoasError::CacheNotConfigured));

        config.cache.enabled = true;
        config.public_base_url = Some("https://api.example.com".to_owned());
        let hypermedia = Hypermedia::from_config(&config, LinkBuilderRegistry::builder()).unwrap();
        assert!(hypermedia.registry().has_cache());
        assert!(hypermedia.directives().requires_cache());
        assert_eq!(hypermedia.public_base_url(), Some("https://api.example.com"));
    }

    #[tokio::test]
    async fn apply_passes_through_non_linked_responses() {
        let hypermedia =
            Hypermedia::new(LinkBuilderRegistry::builder().build(), DirectiveTable::new()).unwrap();
        let response = Response::new(Body::from("plain"));
        let out = hypermedia
            .apply(&LinkContext::default(), response)
            .await;
        let bytes = axum::body::to_bytes(out.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"plain");
    }

    #[tokio::test]
    #[traced_test]
    async fn generation_failure_is_logged_and_rendered_as_problem() {
        let table = DirectiveTable::new().with_global(Policy::Always, false).unwrap();
        let hypermedia = Hypermedia::new(LinkBuilderRegistry::builder().build(), table).unwrap();
        let response = Linked(Invoice {
            id: 1,
            links: Vec::new(),
        })
        .into_response();
        let ctx = LinkContext::new(RouteId::new("billing", "get_invoice").unwrap()).with_path("/invoices/1");

        let out = hypermedia.apply(&ctx, response).await;

        assert_eq!(out.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(logs_contain("link generation failed"));
        assert!(logs_contain("Invoice"));
    }
}
