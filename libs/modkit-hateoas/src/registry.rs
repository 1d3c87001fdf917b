//! Type-directed link builder registry.
//!
//! Builders are registered once per resource type at startup through
//! [`LinkBuilderRegistryBuilder`]; the built [`LinkBuilderRegistry`] is
//! immutable and meant to be shared behind an `Arc`.
//!
//! Implementation details:
//! - Key = `TypeId` of the resource type; value = the type's `Registration<T>`
//!   stored as `Box<dyn Any + Send + Sync>` and downcast on lookup.
//! - Each registration captures the resource's [`CacheKeyResolver`], so the
//!   identity lookup strategy is decided once per type, not per request.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::LinkCache;
use crate::context::{LinkContext, RouteId};
use crate::directive::Policy;
use crate::error::HateoasError;
use crate::identity::{CacheKeyResolver, IdentitySource};
use crate::link::{Link, LinkBuilder, Linkable};
use crate::negotiation::accepts_hateoas;

type Boxed = Box<dyn Any + Send + Sync>;

struct Registration<T> {
    builder: Box<dyn LinkBuilder<T>>,
    keys: CacheKeyResolver<T>,
}

struct Entry {
    type_name: &'static str,
    registration: Boxed,
}

/// Identifies a resource type for startup validation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceType {
    id: TypeId,
    name: &'static str,
}

impl ResourceType {
    #[must_use]
    pub fn of<T: Linkable>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::type_name(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Default)]
pub struct LinkBuilderRegistryBuilder {
    entries: HashMap<TypeId, Entry>,
    cache: Option<Arc<dyn LinkCache>>,
    default_ttl: Option<Duration>,
}

impl LinkBuilderRegistryBuilder {
    /// Register the builder for `T`. Cache identity comes from
    /// [`Linkable::cache_identity`] when the type provides one, else from its
    /// conventional `Id` fields.
    ///
    /// # Errors
    /// Returns `HateoasError::DuplicateBuilder` if `T` already has a builder.
    pub fn register<T, B>(self, builder: B) -> Result<Self, HateoasError>
    where
        T: Linkable,
        B: LinkBuilder<T> + 'static,
    {
        self.register_with_identity(builder, IdentitySource::conventional())
    }

    /// Register the builder for `T` with an explicit field-based identity
    /// fallback. A custom [`Linkable::cache_identity`] still takes precedence.
    ///
    /// # Errors
    /// Returns `HateoasError::DuplicateBuilder` if `T` already has a builder.
    pub fn register_with_identity<T, B>(
        mut self,
        builder: B,
        identity: IdentitySource<T>,
    ) -> Result<Self, HateoasError>
    where
        T: Linkable,
        B: LinkBuilder<T> + 'static,
    {
        let type_name = T::type_name();
        if self.entries.contains_key(&TypeId::of::<T>()) {
            return Err(HateoasError::DuplicateBuilder { type_name });
        }

        let registration = Registration {
            builder: Box::new(builder),
            keys: CacheKeyResolver::new(identity),
        };
        self.entries.insert(
            TypeId::of::<T>(),
            Entry {
                type_name,
                registration: Box::new(registration),
            },
        );
        tracing::debug!(resource = type_name, "registered link builder");
        Ok(self)
    }

    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn LinkCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// TTL applied to every entry the registry writes. `None` = no expiry.
    #[must_use]
    pub fn default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    #[must_use]
    pub fn build(self) -> LinkBuilderRegistry {
        LinkBuilderRegistry {
            entries: self.entries,
            cache: self.cache,
            default_ttl: self.default_ttl,
        }
    }
}

/// Resolves link builders per resource type and orchestrates negotiation
/// and caching around them.
pub struct LinkBuilderRegistry {
    entries: HashMap<TypeId, Entry>,
    cache: Option<Arc<dyn LinkCache>>,
    default_ttl: Option<Duration>,
}

impl LinkBuilderRegistry {
    #[must_use]
    pub fn builder() -> LinkBuilderRegistryBuilder {
        LinkBuilderRegistryBuilder::default()
    }

    #[must_use]
    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    #[must_use]
    pub fn is_registered<T: Linkable>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Fail fast when `T` has no builder.
    ///
    /// # Errors
    /// Returns `HateoasError::UnregisteredBuilder` naming `T`.
    pub fn ensure_registered<T: Linkable>(&self) -> Result<(), HateoasError> {
        self.validate(&[ResourceType::of::<T>()])
    }

    /// Check a list of known resource types against the registrations.
    ///
    /// # Errors
    /// Returns `HateoasError::UnregisteredBuilder` for the first type without a builder.
    pub fn validate(&self, types: &[ResourceType]) -> Result<(), HateoasError> {
        if let Some(missing) = types.iter().find(|t| !self.entries.contains_key(&t.id)) {
            return Err(HateoasError::UnregisteredBuilder {
                type_name: missing.name,
            });
        }
        Ok(())
    }

    /// Names of all registered resource types, sorted.
    #[must_use]
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        names
    }

    /// Cache key `resource` would be stored under when rendered for `route`.
    ///
    /// # Errors
    /// Returns `UnregisteredBuilder` if `T` is unknown, `UndeterminableIdentity`
    /// if no identity can be derived.
    pub fn cache_key<T: Linkable>(&self, resource: &T, route: &RouteId) -> Result<String, HateoasError> {
        self.registration::<T>()?.keys.compute_key(resource, route)
    }

    /// Compute the links of `resource` under `policy`.
    ///
    /// `Never` and unrequested `OnDemand` return no links without touching the
    /// builder or the cache. Without `caching` the builder runs on every call.
    /// With it, the cache is consulted first and a miss is written back, unless
    /// the request has been cancelled in the meantime. Concurrent misses for
    /// one key may each run the builder; the last write wins.
    ///
    /// # Errors
    /// - `UnregisteredBuilder` if `T` has no builder;
    /// - `CacheNotConfigured` if `caching` is requested without a cache;
    /// - `UndeterminableIdentity` if the cache key cannot be derived;
    /// - `Cache` if the backend fails.
    pub async fn generate<T: Linkable>(
        &self,
        resource: &T,
        ctx: &LinkContext,
        policy: Policy,
        caching: bool,
    ) -> Result<Vec<Link>, HateoasError> {
        if policy == Policy::Never {
            return Ok(Vec::new());
        }
        if policy == Policy::OnDemand && !accepts_hateoas(ctx.accept()) {
            tracing::trace!(resource = T::type_name(), "links not requested");
            return Ok(Vec::new());
        }

        let registration = self.registration::<T>()?;
        if !caching {
            return Ok(registration.builder.build_links(resource, ctx));
        }

        let cache = self.cache.as_ref().ok_or(HateoasError::CacheNotConfigured)?;
        let key = registration.keys.compute_key(resource, ctx.route())?;

        if let Some(links) = cache.try_get(&key).await.map_err(HateoasError::Cache)? {
            tracing::debug!(key = %key, "link cache hit");
            return Ok(links);
        }

        let links = registration.builder.build_links(resource, ctx);
        if ctx.is_cancelled() {
            tracing::debug!(key = %key, "request cancelled, skipping link cache write");
            return Ok(links);
        }

        cache
            .set(&key, links.clone(), self.default_ttl)
            .await
            .map_err(HateoasError::Cache)?;
        tracing::debug!(key = %key, count = links.len(), "link cache miss, stored");
        Ok(links)
    }

    fn registration<T: Linkable>(&self) -> Result<&Registration<T>, HateoasError> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.registration.downcast_ref::<Registration<T>>())
            .ok_or(HateoasError::UnregisteredBuilder {
                type_name: T::type_name(),
            })
    }
}

impl fmt::Debug for LinkBuilderRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut resources: Vec<_> = self.entries.values().map(|e| e.type_name).collect();
        resources.sort_unstable();
        f.debug_struct("LinkBuilderRegistryBuilder")
            .field("resources", &resources)
            .field("cache", &self.cache.is_some())
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for LinkBuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkBuilderRegistry")
            .field("resources", &self.registered_types())
            .field("cache", &self.cache.is_some())
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::cache::InMemoryLinkCache;
    use serde::Serialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Serialize)]
    struct Order {
        id: String,
        links: Vec<Link>,
    }

    impl Linkable for Order {
        fn links_mut(&mut self) -> &mut Vec<Link> {
            &mut self.links
        }
    }

    #[derive(Serialize)]
    struct Note {
        text: String,
        links: Vec<Link>,
    }

    impl Linkable for Note {
        fn links_mut(&mut self) -> &mut Vec<Link> {
            &mut self.links
        }
    }

    #[derive(Clone, Default)]
    struct CountingBuilder(Arc<AtomicUsize>);

    impl LinkBuilder<Order> for CountingBuilder {
        fn build_links(&self, order: &Order, ctx: &LinkContext) -> Vec<Link> {
            self.0.fetch_add(1, Ordering::SeqCst);
            vec![Link::get(ctx.url_for("/orders/{id}", &[("id", order.id.as_str())]), "self")]
        }
    }

    fn order() -> Order {
        Order {
            id: "42".to_owned(),
            links: Vec::new(),
        }
    }

    fn ctx(accept: &str) -> LinkContext {
        LinkContext::new(RouteId::new("orders", "get_order").unwrap()).with_accept(accept)
    }

    #[tokio::test]
    async fn never_returns_nothing_even_for_unregistered_types() {
        let registry = LinkBuilderRegistry::builder().build();
        let links = registry
            .generate(&order(), &ctx("application/hateoas+json"), Policy::Never, true)
            .await
            .unwrap();
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn on_demand_without_negotiation_skips_builder() {
        let builder = CountingBuilder::default();
        let registry = LinkBuilderRegistry::builder()
            .register::<Order, _>(builder.clone())
            .unwrap()
            .build();

        let links = registry
            .generate(&order(), &ctx("application/json"), Policy::OnDemand, false)
            .await
            .unwrap();
        assert!(links.is_empty());
        assert_eq!(builder.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn always_without_caching_calls_builder_each_time() {
        let builder = CountingBuilder::default();
        let registry = LinkBuilderRegistry::builder()
            .register::<Order, _>(builder.clone())
            .unwrap()
            .build();

        for _ in 0..2 {
            let links = registry
                .generate(&order(), &ctx(""), Policy::Always, false)
                .await
                .unwrap();
            assert_eq!(links, vec![Link::get("/orders/42", "self")]);
        }
        assert_eq!(builder.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unregistered_type_is_reported() {
        let registry = LinkBuilderRegistry::builder()
            .register::<Order, _>(CountingBuilder::default())
            .unwrap()
            .build();

        let note = Note {
            text: "hi".to_owned(),
            links: Vec::new(),
        };
        let err = registry
            .generate(&note, &ctx(""), Policy::Always, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HateoasError::UnregisteredBuilder { type_name: "Note" }
        ));
        assert!(registry.ensure_registered::<Note>().is_err());
        assert!(registry.ensure_registered::<Order>().is_ok());
    }

    #[tokio::test]
    async fn caching_without_cache_is_a_configuration_error() {
        let registry = LinkBuilderRegistry::builder()
            .register::<Order, _>(CountingBuilder::default())
            .unwrap()
            .build();

        let err = registry
            .generate(&order(), &ctx(""), Policy::Always, true)
            .await
            .unwrap_err();
        assert!(matches!(err, HateoasError::CacheNotConfigured));
    }

    #[tokio::test]
    async fn cached_links_are_served_without_rebuilding() {
        let builder = CountingBuilder::default();
        let registry = LinkBuilderRegistry::builder()
            .register::<Order, _>(builder.clone())
            .unwrap()
            .cache(Arc::new(InMemoryLinkCache::new()))
            .build();

        let first = registry
            .generate(&order(), &ctx(""), Policy::Always, true)
            .await
            .unwrap();
        let second = registry
            .generate(&order(), &ctx(""), Policy::Always, true)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(builder.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let err = LinkBuilderRegistry::builder()
            .register::<Order, _>(CountingBuilder::default())
            .unwrap()
            .register::<Order, _>(CountingBuilder::default())
            .unwrap_err();
        assert!(matches!(
            err,
            HateoasError::DuplicateBuilder { type_name: "Order" }
        ));
    }

    #[test]
    fn plain_registration_prefers_custom_identity_over_id_field() {
        #[derive(Serialize)]
        struct Shipment {
            id: String,
            carrier: String,
            links: Vec<Link>,
        }

        impl Linkable for Shipment {
            fn links_mut(&mut self) -> &mut Vec<Link> {
                &mut self.links
            }

            fn cache_identity(&self) -> Option<String> {
                Some(format!("{}/{}", self.carrier, self.id))
            }
        }

        let registry = LinkBuilderRegistry::builder()
            .register::<Shipment, _>(|_: &Shipment, _: &LinkContext| Vec::new())
            .unwrap()
            .build();
        let shipment = |carrier: &str| Shipment {
            id: "1".to_owned(),
            carrier: carrier.to_owned(),
            links: Vec::new(),
        };
        let route = RouteId::new("g", "h").unwrap();

        let ups = registry.cache_key(&shipment("ups"), &route).unwrap();
        let dhl = registry.cache_key(&shipment("dhl"), &route).unwrap();
        assert_eq!(ups, "g:h:Shipment:ups/1");
        assert_eq!(dhl, "g:h:Shipment:dhl/1");
    }

    #[test]
    fn validate_and_introspection() {
        let registry = LinkBuilderRegistry::builder()
            .register::<Order, _>(CountingBuilder::default())
            .unwrap()
            .build();

        assert!(registry.is_registered::<Order>());
        assert!(!registry.is_registered::<Note>());
        assert_eq!(registry.registered_types(), vec!["Order"]);
        let err = registry
            .validate(&[ResourceType::of::<Order>(), ResourceType::of::<Note>()])
            .unwrap_err();
        assert!(err.to_string().contains("Note"));
        assert!(!registry.has_cache());
    }
}
