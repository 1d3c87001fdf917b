//! OpenAPI documentation of the `_links` property.

use utoipa::openapi::schema::{ArrayBuilder, Schema};
use utoipa::openapi::{Components, OpenApi, Ref, RefOr};
use utoipa::{Modify, PartialSchema, ToSchema};

use crate::link::Link;

/// Property name linkable resources serialize their links under.
pub const LINKS_PROPERTY: &str = "_links";

/// `_links: array<Link>` schema.
#[must_use]
pub fn links_property() -> RefOr<Schema> {
    RefOr::T(Schema::Array(
        ArrayBuilder::new()
            .items(Ref::from_schema_name(Link::name()))
            .description(Some("Hypermedia links"))
            .build(),
    ))
}

/// Add the `_links` property to an object schema.
///
/// Returns `false` and leaves the schema alone when it is not an inline
/// object or already declares the property.
pub fn add_links_property(schema: &mut RefOr<Schema>) -> bool {
    let RefOr::T(Schema::Object(object)) = schema else {
        return false;
    };
    if object.properties.contains_key(LINKS_PROPERTY) {
        return false;
    }
    object
        .properties
        .insert(LINKS_PROPERTY.to_owned(), links_property());
    true
}

/// OpenAPI modifier documenting `_links` on the registered resource schemas.
///
/// Also registers the `Link` component the property refers to.
#[derive(Debug, Clone, Default)]
pub struct LinksSchema {
    resources: Vec<String>,
}

impl LinksSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn resource<T: ToSchema>(mut self) -> Self {
        self.resources.push(T::name().into_owned());
        self
    }
}

impl Modify for LinksSchema {
    fn modify(&self, openapi: &mut OpenApi) {
        let components = openapi.components.get_or_insert_with(Components::new);
        components
            .schemas
            .entry(Link::name().into_owned())
            .or_insert_with(Link::schema);

        for name in &self.resources {
            match components.schemas.get_mut(name) {
                Some(schema) => {
                    if add_links_property(schema) {
                        tracing::trace!(schema = %name, "documented _links");
                    }
                }
                None => tracing::warn!(schema = %name, "linkable schema is not registered"),
            }
        }
    }
}
