//! Hypermedia link model, linkable resources and the per-type builder contract.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::context::LinkContext;

/// Navigational reference embedded in a resource representation.
///
/// Immutable once built; two links are equal when all three parts are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[schema(title = "Link", description = "Hypermedia link")]
pub struct Link {
    /// Absolute or relative URL of the target.
    href: String,
    /// Relation name, e.g. `self` or `cancel`.
    rel: String,
    /// HTTP method to use when following the link.
    method: String,
}

impl Link {
    #[must_use]
    pub fn new(href: impl Into<String>, rel: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: rel.into(),
            method: method.into(),
        }
    }

    #[must_use]
    pub fn get(href: impl Into<String>, rel: impl Into<String>) -> Self {
        Self::new(href, rel, http::Method::GET.as_str())
    }

    #[must_use]
    pub fn post(href: impl Into<String>, rel: impl Into<String>) -> Self {
        Self::new(href, rel, http::Method::POST.as_str())
    }

    #[must_use]
    pub fn put(href: impl Into<String>, rel: impl Into<String>) -> Self {
        Self::new(href, rel, http::Method::PUT.as_str())
    }

    #[must_use]
    pub fn patch(href: impl Into<String>, rel: impl Into<String>) -> Self {
        Self::new(href, rel, http::Method::PATCH.as_str())
    }

    #[must_use]
    pub fn delete(href: impl Into<String>, rel: impl Into<String>) -> Self {
        Self::new(href, rel, http::Method::DELETE.as_str())
    }

    #[must_use]
    pub fn href(&self) -> &str {
        &self.href
    }

    #[must_use]
    pub fn rel(&self) -> &str {
        &self.rel
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

/// A resource that carries a mutable collection of hypermedia links.
///
/// Types whose identity is not a single `id`-like field override
/// [`Linkable::cache_identity`].
///
/// Implementors usually serialize the collection as `_links`:
///
/// ```
/// use modkit_hateoas::{Link, Linkable};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Order {
///     id: String,
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
/// assert_eq!(Order::type_name(), "Order");
/// ```
pub trait Linkable: Serialize + Send + Sync + 'static {
    fn links_mut(&mut self) -> &mut Vec<Link>;

    /// Replace the whole link collection; never merges with what was there.
    fn set_links(&mut self, links: Vec<Link>) {
        *self.links_mut() = links;
    }

    /// Custom cache identity. When `Some`, it is used verbatim in cache keys
    /// and field-based identity lookup is not attempted.
    fn cache_identity(&self) -> Option<String> {
        None
    }

    /// Name used in cache keys and diagnostics. Defaults to the unqualified Rust type name.
    #[must_use]
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        short_type_name::<Self>()
    }
}

/// Strategy that computes the links of one resource type.
///
/// Must be a pure function of the resource and the request context: the
/// registry may cache its output and may call it concurrently for the same
/// resource.
pub trait LinkBuilder<T>: Send + Sync {
    fn build_links(&self, resource: &T, ctx: &LinkContext) -> Vec<Link>;
}

impl<T, F> LinkBuilder<T> for F
where
    F: Fn(&T, &LinkContext) -> Vec<Link> + Send + Sync,
{
    fn build_links(&self, resource: &T, ctx: &LinkContext) -> Vec<Link> {
        self(resource, ctx)
    }
}

/// Last path segment of `type_name::<T>()`, without generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
