//! Error types for hypermedia link generation.
//!
//! Configuration-shape errors (`UnregisteredBuilder`, `CacheNotConfigured`,
//! duplicate registrations) are meant to be caught at startup. Everything
//! that escapes `LinkBuilderRegistry::generate` at request time is rendered
//! by the response layer as an RFC 9457 Problem Details document.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::directive::Scope;

/// Content type for Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

#[derive(Debug, thiserror::Error)]
pub enum HateoasError {
    #[error("no link builder is registered for resource type '{type_name}'")]
    UnregisteredBuilder { type_name: &'static str },

    #[error("a link builder is already registered for resource type '{type_name}'")]
    DuplicateBuilder { type_name: &'static str },

    #[error("link caching was requested, but no link cache is configured")]
    CacheNotConfigured,

    #[error("cannot determine cache identity for '{type_name}': {reason}")]
    UndeterminableIdentity {
        type_name: &'static str,
        reason: String,
    },

    #[error("a {scope} directive is already declared for '{target}'")]
    DuplicateDirective { scope: Scope, target: String },

    #[error("link cache backend failed: {0}")]
    Cache(#[source] anyhow::Error),

    #[error("failed to render linked resource: {0}")]
    Render(#[source] serde_json::Error),

    #[error("invalid hypermedia configuration: {0}")]
    Config(String),

    #[error("route name '{name}' must not contain ':'")]
    InvalidRouteName { name: String },
}

impl HateoasError {
    /// Machine-readable code used in problem responses.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnregisteredBuilder { .. } => "HATEOAS_UNREGISTERED_BUILDER",
            Self::DuplicateBuilder { .. } => "HATEOAS_DUPLICATE_BUILDER",
            Self::CacheNotConfigured => "HATEOAS_CACHE_NOT_CONFIGURED",
            Self::UndeterminableIdentity { .. } => "HATEOAS_UNDETERMINABLE_IDENTITY",
            Self::DuplicateDirective { .. } => "HATEOAS_DUPLICATE_DIRECTIVE",
            Self::Cache(_) => "HATEOAS_CACHE_FAILURE",
            Self::Render(_) => "HATEOAS_RENDER_FAILURE",
            Self::Config(_) => "HATEOAS_INVALID_CONFIG",
            Self::InvalidRouteName { .. } => "HATEOAS_INVALID_ROUTE_NAME",
        }
    }

    /// Render this error as a problem response for the given request path.
    #[must_use]
    pub fn into_problem_response(self, instance: &str) -> Response {
        // Every variant is a server-side fault.
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let problem = ProblemBody {
            type_url: "about:blank",
            title: "Hypermedia Error",
            status: status.as_u16(),
            detail: self.to_string(),
            instance,
            code: self.code(),
            trace_id: tracing::Span::current()
                .id()
                .map(|id| id.into_u64().to_string()),
        };

        let mut response = (status, axum::Json(problem)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        response
    }
}

impl IntoResponse for HateoasError {
    fn into_response(self) -> Response {
        self.into_problem_response("")
    }
}

#[derive(Serialize)]
struct ProblemBody<'a> {
    #[serde(rename = "type")]
    type_url: &'static str,
    title: &'static str,
    status: u16,
    detail: String,
    instance: &'a str,
    code: &'static str,
    trace_id: Option<String>,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn problem_response_carries_code_and_content_type() {
        let response = HateoasError::CacheNotConfigured.into_problem_response("/orders/42");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            APPLICATION_PROBLEM_JSON
        );
    }

    #[tokio::test]
    async fn problem_body_uses_about_blank_type() {
        let response = HateoasError::CacheNotConfigured.into_problem_response("/orders/42");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["type"], "about:blank");
        assert_eq!(json["status"], 500);
        assert_eq!(json["instance"], "/orders/42");
        assert_eq!(json["code"], "HATEOAS_CACHE_NOT_CONFIGURED");
    }

    #[test]
    fn identity_error_names_type() {
        let err = HateoasError::UndeterminableIdentity {
            type_name: "Order",
            reason: "field 'id' is null".to_owned(),
        };
        assert!(err.to_string().contains("Order"));
        assert_eq!(err.code(), "HATEOAS_UNDETERMINABLE_IDENTITY");
    }
}
