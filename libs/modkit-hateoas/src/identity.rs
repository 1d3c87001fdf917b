//! Cache-key derivation for linkable resources.
//!
//! A key is `{group}:{handler}:{TypeName}:{identity}`. The identity part comes
//! from the resource itself:
//!
//! 1. [`Linkable::cache_identity`], when the type overrides it, is used verbatim
//!    and always wins;
//! 2. otherwise an `Id`-shaped field of the serialized resource is stringified,
//!    looked up through the [`IdentitySource`] fixed when the builder was
//!    registered ([`IdentitySource::conventional`] or [`IdentitySource::field`]).
//!
//! Candidate field names are computed once, at registration, and reused for
//! every resource of that type.

use std::fmt;
use std::marker::PhantomData;

use serde_json::Value;

use crate::context::RouteId;
use crate::error::HateoasError;
use crate::link::Linkable;

/// Field-based fallback used when a resource has no custom cache identity.
pub struct IdentitySource<T> {
    fields: Vec<String>,
    _resource: PhantomData<fn(&T)>,
}

impl<T: Linkable> IdentitySource<T> {
    /// Look for the conventional identifier fields: `Id`, `id`,
    /// `<TypeName>Id`, `<typeName>Id` and `<type_name>_id`, first match wins.
    #[must_use]
    pub fn conventional() -> Self {
        Self::with_fields(conventional_fields(T::type_name()))
    }

    /// Use one explicitly named field of the serialized resource.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::with_fields(vec![name.into()])
    }

    fn with_fields(fields: Vec<String>) -> Self {
        Self {
            fields,
            _resource: PhantomData,
        }
    }
}

impl<T> fmt::Debug for IdentitySource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySource")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Derives deterministic cache keys for resources of one type.
#[derive(Debug)]
pub struct CacheKeyResolver<T> {
    type_name: &'static str,
    source: IdentitySource<T>,
}

impl<T: Linkable> CacheKeyResolver<T> {
    #[must_use]
    pub fn new(source: IdentitySource<T>) -> Self {
        Self {
            type_name: T::type_name(),
            source,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Full cache key for `resource` rendered under `route`.
    ///
    /// # Errors
    /// Returns `HateoasError::UndeterminableIdentity` when no identity can be derived.
    pub fn compute_key(&self, resource: &T, route: &RouteId) -> Result<String, HateoasError> {
        let identity = self.identity(resource)?;
        Ok(format!(
            "{}:{}:{}:{identity}",
            route.group(),
            route.handler(),
            self.type_name
        ))
    }

    /// Identity part of the key.
    ///
    /// # Errors
    /// Returns `HateoasError::UndeterminableIdentity` if the custom identity is
    /// blank, or if no candidate field is present, or if the field found is
    /// null, blank or not a scalar.
    pub fn identity(&self, resource: &T) -> Result<String, HateoasError> {
        match resource.cache_identity() {
            Some(identity) if identity.trim().is_empty() => {
                Err(self.undeterminable("custom cache identity is empty"))
            }
            Some(identity) => Ok(identity),
            None => self.field_identity(resource, &self.source.fields),
        }
    }

    fn field_identity(&self, resource: &T, candidates: &[String]) -> Result<String, HateoasError> {
        let value = serde_json::to_value(resource)
            .map_err(|e| self.undeterminable(format!("resource does not serialize: {e}")))?;
        let Value::Object(fields) = value else {
            return Err(self.undeterminable("resource does not serialize to an object"));
        };

        let Some((name, id)) = candidates
            .iter()
            .find_map(|name| fields.get(name).map(|id| (name, id)))
        else {
            return Err(self.undeterminable(format!(
                "none of the identity fields [{}] is present; override Linkable::cache_identity or declare the field",
                candidates.join(", ")
            )));
        };

        match id {
            Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Null => Err(self.undeterminable(format!("field '{name}' is null"))),
            Value::String(_) => Err(self.undeterminable(format!("field '{name}' is empty"))),
            Value::Bool(_) | Value::Array(_) | Value::Object(_) => Err(
                self.undeterminable(format!("field '{name}' is not a string or number")),
            ),
        }
    }

    fn undeterminable(&self, reason: impl Into<String>) -> HateoasError {
        HateoasError::UndeterminableIdentity {
            type_name: self.type_name,
            reason: reason.into(),
        }
    }
}

fn conventional_fields(type_name: &str) -> Vec<String> {
    let mut lower_camel = String::with_capacity(type_name.len());
    let mut chars = type_name.chars();
    if let Some(first) = chars.next() {
        lower_camel.extend(first.to_lowercase());
        lower_camel.push_str(chars.as_str());
    }

    let mut fields = vec![
        "Id".to_owned(),
        "id".to_owned(),
        format!("{type_name}Id"),
        format!("{lower_camel}Id"),
        format!("{}_id", to_snake_case(type_name)),
    ];
    let mut seen = std::collections::HashSet::new();
    fields.retain(|f| seen.insert(f.clone()));
    fields
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
