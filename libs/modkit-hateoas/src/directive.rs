//! Link policies, directives and specificity-based scope resolution.
//!
//! A [`Directive`] says *whether* links are generated (its [`Policy`]) and
//! whether the result may be cached. Directives are declared at three
//! levels of specificity: once for the whole application, once per handler
//! group, and once per handler. For any given response exactly one of them
//! governs: the most specific one present.
//!
//! Directives live in an explicit [`DirectiveTable`] built at startup, so the
//! governing directive for a route is found by a plain lookup instead of by
//! inspecting the middleware stack.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::{RouteId, check_route_name};
use crate::error::HateoasError;

/// Rule governing whether links are computed for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Links are computed unconditionally.
    Always,
    /// Links are computed only when the request asks for them via `Accept`.
    #[default]
    OnDemand,
    /// Links are never computed.
    Never,
}

/// Specificity level a directive is declared at. Ordered, `Handler` is the most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Global,
    Group,
    Handler,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Global => "global",
            Self::Group => "group",
            Self::Handler => "handler",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Directive {
    policy: Policy,
    caching: bool,
    scope: Scope,
}

impl Directive {
    #[must_use]
    pub const fn new(policy: Policy, caching: bool, scope: Scope) -> Self {
        Self {
            policy,
            caching,
            scope,
        }
    }

    #[must_use]
    pub const fn global(policy: Policy, caching: bool) -> Self {
        Self::new(policy, caching, Scope::Global)
    }

    #[must_use]
    pub const fn group(policy: Policy, caching: bool) -> Self {
        Self::new(policy, caching, Scope::Group)
    }

    #[must_use]
    pub const fn handler(policy: Policy, caching: bool) -> Self {
        Self::new(policy, caching, Scope::Handler)
    }

    #[must_use]
    pub const fn policy(self) -> Policy {
        self.policy
    }

    #[must_use]
    pub const fn caching(self) -> bool {
        self.caching
    }

    #[must_use]
    pub const fn scope(self) -> Scope {
        self.scope
    }
}

/// Picks the single directive that governs a response.
pub struct ScopeResolver;

impl ScopeResolver {
    /// Returns the most specific directive of the active set.
    ///
    /// `None` means no directive is active and link generation does not run.
    /// The active set never holds two directives of the same scope; the
    /// [`DirectiveTable`] rejects that at registration time.
    #[must_use]
    pub fn resolve(active: &[Directive]) -> Option<Directive> {
        active.iter().copied().max_by_key(|d| d.scope)
    }

    /// True when a strictly more specific directive than `current` is active.
    #[must_use]
    pub fn is_shadowed(current: Directive, active: &[Directive]) -> bool {
        active.iter().any(|d| d.scope > current.scope)
    }
}

/// Startup-time registry of directives keyed by scope.
///
/// Built once, then shared read-only for the process lifetime.
///
/// ```
/// use modkit_hateoas::{DirectiveTable, Policy, RouteId, Scope};
///
/// let table = DirectiveTable::new()
///     .with_global(Policy::OnDemand, false)?
///     .with_group("orders", Policy::Always, true)?
///     .with_handler("orders", "delete_order", Policy::Never, false)?;
///
/// let governing = table.resolve(&RouteId::new("orders", "get_order")?).unwrap();
/// assert_eq!(governing.scope(), Scope::Group);
/// # Ok::<(), modkit_hateoas::HateoasError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DirectiveTable {
    global: Option<Directive>,
    groups: HashMap<String, Directive>,
    handlers: HashMap<(String, String), Directive>,
}

impl DirectiveTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the application-wide directive.
    ///
    /// # Errors
    /// Returns `HateoasError::DuplicateDirective` if a global directive is already declared.
    pub fn with_global(mut self, policy: Policy, caching: bool) -> Result<Self, HateoasError> {
        if self.global.is_some() {
            return Err(HateoasError::DuplicateDirective {
                scope: Scope::Global,
                target: "*".to_owned(),
            });
        }
        self.global = Some(Directive::global(policy, caching));
        Ok(self)
    }

    /// Declare the directive for every handler of `group`.
    ///
    /// # Errors
    /// Returns `HateoasError::InvalidRouteName` if `group` contains `:`,
    /// `HateoasError::DuplicateDirective` if `group` already has one.
    pub fn with_group(
        mut self,
        group: impl Into<String>,
        policy: Policy,
        caching: bool,
    ) -> Result<Self, HateoasError> {
        let group = group.into();
        check_route_name(&group)?;
        if self.groups.contains_key(&group) {
            return Err(HateoasError::DuplicateDirective {
                scope: Scope::Group,
                target: group,
            });
        }
        self.groups.insert(group, Directive::group(policy, caching));
        Ok(self)
    }

    /// Declare the directive for a single handler.
    ///
    /// # Errors
    /// Returns `HateoasError::InvalidRouteName` if either name contains `:`,
    /// `HateoasError::DuplicateDirective` if the handler already has one.
    pub fn with_handler(
        mut self,
        group: impl Into<String>,
        handler: impl Into<String>,
        policy: Policy,
        caching: bool,
    ) -> Result<Self, HateoasError> {
        let key = (group.into(), handler.into());
        check_route_name(&key.0)?;
        check_route_name(&key.1)?;
        if self.handlers.contains_key(&key) {
            return Err(HateoasError::DuplicateDirective {
                scope: Scope::Handler,
                target: format!("{}:{}", key.0, key.1),
            });
        }
        self.handlers.insert(key, Directive::handler(policy, caching));
        Ok(self)
    }

    /// Directives that apply to `route`, least specific first.
    #[must_use]
    pub fn active_for(&self, route: &RouteId) -> Vec<Directive> {
        let handler_key = (route.group().to_owned(), route.handler().to_owned());
        self.global
            .into_iter()
            .chain(self.groups.get(route.group()).copied())
            .chain(self.handlers.get(&handler_key).copied())
            .collect()
    }

    /// The directive governing `route`, if any.
    #[must_use]
    pub fn resolve(&self, route: &RouteId) -> Option<Directive> {
        ScopeResolver::resolve(&self.active_for(route))
    }

    /// True when at least one declared directive enables caching.
    #[must_use]
    pub fn requires_cache(&self) -> bool {
        self.global
            .iter()
            .chain(self.groups.values())
            .chain(self.handlers.values())
            .any(|d| d.caching)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.global.is_none() && self.groups.is_empty() && self.handlers.is_empty()
    }
}
