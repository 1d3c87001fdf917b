//! Per-response decision whether link generation runs.

use crate::context::LinkContext;
use crate::directive::{Directive, Policy, ScopeResolver};
use crate::error::HateoasError;
use crate::link::Linkable;
use crate::negotiation::accepts_hateoas;
use crate::registry::LinkBuilderRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No directive is active for the route.
    NoDirective,
    /// A more specific directive governs the response.
    Shadowed,
    PolicyNever,
    /// `OnDemand` and the client did not negotiate links.
    NotRequested,
    /// The response is not a successful linkable payload.
    NotLinkable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptState {
    Pending,
    Skipped(SkipReason),
    Ran,
}

/// One interception of one response.
///
/// Starts `Pending` and moves to exactly one terminal state. Once terminal,
/// further calls are no-ops returning that state, so links are assigned at
/// most once per response.
#[derive(Debug)]
pub struct ResponseInterceptor<'a> {
    current: Option<Directive>,
    active: &'a [Directive],
    state: InterceptState,
}

impl<'a> ResponseInterceptor<'a> {
    /// Interceptor for the `current` directive within the `active` set.
    #[must_use]
    pub fn new(current: Option<Directive>, active: &'a [Directive]) -> Self {
        Self {
            current,
            active,
            state: InterceptState::Pending,
        }
    }

    /// Interceptor running under the most specific active directive.
    #[must_use]
    pub fn governing(active: &'a [Directive]) -> Self {
        Self::new(ScopeResolver::resolve(active), active)
    }

    #[must_use]
    pub fn state(&self) -> InterceptState {
        self.state
    }

    /// Decide whether links should be generated.
    ///
    /// Returns the directive to run with, or `None` after moving to
    /// `Skipped`. A terminal interceptor always returns `None`.
    pub fn decide(&mut self, accept: &str, linkable_success: bool) -> Option<Directive> {
        if self.state != InterceptState::Pending {
            return None;
        }

        let reason = match self.current {
            None => Some(SkipReason::NoDirective),
            Some(current) if ScopeResolver::is_shadowed(current, self.active) => {
                Some(SkipReason::Shadowed)
            }
            Some(current) => match current.policy() {
                Policy::Never => Some(SkipReason::PolicyNever),
                Policy::OnDemand if !accepts_hateoas(accept) => Some(SkipReason::NotRequested),
                _ if !linkable_success => Some(SkipReason::NotLinkable),
                _ => None,
            },
        };

        if let Some(reason) = reason {
            tracing::debug!(?reason, "link generation skipped");
            self.state = InterceptState::Skipped(reason);
            return None;
        }
        self.current
    }

    /// Generate and assign links to `resource` if this interceptor decides to run.
    ///
    /// The resource is left untouched unless the final state is `Ran`.
    ///
    /// # Errors
    /// Propagates any `HateoasError` from [`LinkBuilderRegistry::generate`];
    /// the interceptor stays `Pending` in that case.
    pub async fn intercept<T: Linkable>(
        &mut self,
        registry: &LinkBuilderRegistry,
        ctx: &LinkContext,
        resource: &mut T,
    ) -> Result<InterceptState, HateoasError> {
        let Some(directive) = self.decide(ctx.accept(), true) else {
            return Ok(self.state);
        };

        let links = registry
            .generate(resource, ctx, directive.policy(), directive.caching())
            .await?;
        resource.set_links(links);
        self.state = InterceptState::Ran;
        Ok(self.state)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::context::RouteId;
    use crate::link::Link;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Order {
        id: u32,
        links: Vec<Link>,
    }

    impl Linkable for Order {
        fn links_mut(&mut self) -> &mut Vec<Link> {
            &mut self.links
        }
    }

    fn registry() -> LinkBuilderRegistry {
        LinkBuilderRegistry::builder()
            .register::<Order, _>(|order: &Order, _: &LinkContext| {
                vec![Link::get(format!("/orders/{}", order.id), "self")]
            })
            .unwrap()
            .build()
    }

    const HATEOAS: &str = "application/hateoas+json";

    #[test]
    fn no_directive_skips() {
        let mut interceptor = ResponseInterceptor::governing(&[]);
        assert!(interceptor.decide(HATEOAS, true).is_none());
        assert_eq!(
            interceptor.state(),
            InterceptState::Skipped(SkipReason::NoDirective)
        );
    }

    #[test]
    fn less_specific_directive_is_shadowed() {
        let global = Directive::global(Policy::Always, false);
        let active = [global, Directive::handler(Policy::Never, false)];

        let mut outer = ResponseInterceptor::new(Some(global), &active);
        assert!(outer.decide(HATEOAS, true).is_none());
        assert_eq!(outer.state(), InterceptState::Skipped(SkipReason::Shadowed));

        let mut governing = ResponseInterceptor::governing(&active);
        governing.decide(HATEOAS, true);
        assert_eq!(
            governing.state(),
            InterceptState::Skipped(SkipReason::PolicyNever)
        );
    }

    #[test]
    fn on_demand_requires_negotiation() {
        let active = [Directive::group(Policy::OnDemand, false)];

        let mut plain = ResponseInterceptor::governing(&active);
        assert!(plain.decide("application/json", true).is_none());
        assert_eq!(plain.state(), InterceptState::Skipped(SkipReason::NotRequested));

        let mut negotiated = ResponseInterceptor::governing(&active);
        assert_eq!(negotiated.decide(HATEOAS, true), Some(active[0]));
        assert_eq!(negotiated.state(), InterceptState::Pending);
    }

    #[test]
    fn unsuccessful_payload_is_not_linkable() {
        let active = [Directive::global(Policy::Always, false)];
        let mut interceptor = ResponseInterceptor::governing(&active);
        assert!(interceptor.decide("", false).is_none());
        assert_eq!(
            interceptor.state(),
            InterceptState::Skipped(SkipReason::NotLinkable)
        );
    }

    #[tokio::test]
    async fn intercept_assigns_links_once() {
        let registry = registry();
        let active = [Directive::global(Policy::Always, false)];
        let ctx = LinkContext::new(RouteId::new("orders", "get_order").unwrap());
        let mut order = Order {
            id: 42,
            links: Vec::new(),
        };

        let mut interceptor = ResponseInterceptor::governing(&active);
        let state = interceptor.intercept(&registry, &ctx, &mut order).await.unwrap();
        assert_eq!(state, InterceptState::Ran);
        assert_eq!(order.links, vec![Link::get("/orders/42", "self")]);

        order.links.clear();
        let state = interceptor.intercept(&registry, &ctx, &mut order).await.unwrap();
        assert_eq!(state, InterceptState::Ran);
        assert!(order.links.is_empty(), "second interception must not run again");
    }

    #[tokio::test]
    async fn skipped_interception_leaves_resource_untouched() {
        let registry = registry();
        let active = [Directive::global(Policy::OnDemand, false)];
        let ctx = LinkContext::new(RouteId::default()).with_accept("application/json");
        let mut order = Order {
            id: 1,
            links: vec![Link::get("/existing", "self")],
        };

        let mut interceptor = ResponseInterceptor::governing(&active);
        let state = interceptor.intercept(&registry, &ctx, &mut order).await.unwrap();

        assert_eq!(state, InterceptState::Skipped(SkipReason::NotRequested));
        assert_eq!(order.links, vec![Link::get("/existing", "self")]);
    }
}
