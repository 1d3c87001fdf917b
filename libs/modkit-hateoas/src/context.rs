//! Per-request context handed to link builders.
//!
//! [`LinkContext`] is the read-only view link generation gets of the current
//! request: the negotiation header, the routing identity of the handler that
//! produced the response, and enough addressing information to turn route
//! templates into URLs.

use std::fmt;

use axum::http::{HeaderMap, header, request::Parts};
use tokio_util::sync::CancellationToken;

use crate::error::HateoasError;

/// Separator between the parts of a cache key; never allowed inside a route name.
pub const KEY_SEPARATOR: char = ':';

/// Routing identity of a handler: its group and its own name.
///
/// Both parts are empty for requests that were not tagged with a route.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct RouteId {
    group: String,
    handler: String,
}

impl RouteId {
    /// # Errors
    /// Returns `HateoasError::InvalidRouteName` if either part contains `:`.
    pub fn new(group: impl Into<String>, handler: impl Into<String>) -> Result<Self, HateoasError> {
        let group = group.into();
        let handler = handler.into();
        check_route_name(&group)?;
        check_route_name(&handler)?;
        Ok(Self { group, handler })
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[must_use]
    pub fn handler(&self) -> &str {
        &self.handler
    }
}

/// Reject group and handler names that would make cache keys ambiguous.
///
/// # Errors
/// Returns `HateoasError::InvalidRouteName` if `name` contains `:`.
pub fn check_route_name(name: &str) -> Result<(), HateoasError> {
    if name.contains(KEY_SEPARATOR) {
        return Err(HateoasError::InvalidRouteName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

impl fmt::Debug for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.handler)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkContext {
    accept: String,
    route: RouteId,
    path: String,
    base_url: Option<String>,
    cancellation: Option<CancellationToken>,
}

impl LinkContext {
    #[must_use]
    pub fn new(route: RouteId) -> Self {
        Self {
            route,
            ..Self::default()
        }
    }

    /// Build a context from the head of an incoming request.
    ///
    /// `public_base_url` wins over the `Host` header when set. A
    /// `CancellationToken` found in the request extensions becomes the
    /// ambient cancellation signal.
    #[must_use]
    pub fn from_parts(parts: &Parts, route: RouteId, public_base_url: Option<&str>) -> Self {
        let base_url = public_base_url
            .map(ToOwned::to_owned)
            .or_else(|| base_url_from_headers(&parts.headers));

        Self {
            accept: accept_header(&parts.headers),
            route,
            path: parts.uri.path().to_owned(),
            base_url,
            cancellation: parts.extensions.get::<CancellationToken>().cloned(),
        }
    }

    #[must_use]
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Raw `Accept` header value; empty when the request carried none.
    #[must_use]
    pub fn accept(&self) -> &str {
        &self.accept
    }

    #[must_use]
    pub fn route(&self) -> &RouteId {
        &self.route
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Expand a route template into a URL.
    ///
    /// `{name}` placeholders are replaced by the percent-encoded value of the
    /// matching parameter; unknown placeholders are kept verbatim. Relative
    /// templates are joined onto the base URL when one is known, absolute
    /// `http(s)://` templates are returned as-is.
    ///
    /// ```
    /// use modkit_hateoas::{LinkContext, RouteId};
    ///
    /// let ctx = LinkContext::new(RouteId::default()).with_base_url("https://api.example.com/");
    /// assert_eq!(
    ///     ctx.url_for("/orders/{id}/items", &[("id", "a b")]),
    ///     "https://api.example.com/orders/a%20b/items"
    /// );
    /// ```
    #[must_use]
    pub fn url_for(&self, template: &str, params: &[(&str, &str)]) -> String {
        let path = expand_template(template, params);
        if path.starts_with("http://") || path.starts_with("https://") {
            return path;
        }
        match &self.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path,
        }
    }
}

/// All `Accept` header values joined into one comma-separated list.
#[must_use]
pub fn accept_header(headers: &HeaderMap) -> String {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(", ")
}

fn base_url_from_headers(headers: &HeaderMap) -> Option<String> {
    let host = headers.get(header::HOST)?.to_str().ok()?;
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    Some(format!("{scheme}://{host}"))
}

fn expand_template(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let name = &after[..close];
        match params.iter().find(|(k, _)| *k == name) {
            Some((_, value)) => out.push_str(&urlencoding::encode(value)),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}
