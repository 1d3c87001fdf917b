//! Hypermedia configuration and its layered loading.
//!
//! Sources, lowest precedence first: built-in defaults, an optional YAML
//! file, then `HATEOAS__`-prefixed environment variables with `__` as the
//! nesting separator (`HATEOAS__CACHE__TTL=10m`).

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

use crate::directive::{DirectiveTable, Policy, Scope};
use crate::error::HateoasError;

pub const ENV_PREFIX: &str = "HATEOAS__";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HypermediaConfig {
    /// Policy of the application-wide directive; `on_demand` by default.
    pub default_policy: Policy,
    /// Whether the application-wide directive caches generated links.
    pub caching: bool,
    pub cache: CacheConfig,
    /// Externally visible base URL; overrides the request `Host` when set.
    pub public_base_url: Option<String>,
    /// Group and handler directives.
    pub directives: Vec<DirectiveConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Attach the in-memory link cache.
    pub enabled: bool,
    /// Lifetime of cached link sets; unset means no expiry.
    #[serde(with = "humantime_option")]
    pub ttl: Option<Duration>,
    pub max_entries: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectiveConfig {
    pub scope: Scope,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub handler: Option<String>,
    pub policy: Policy,
    #[serde(default)]
    pub caching: bool,
}

impl HypermediaConfig {
    /// Load the configuration from defaults, `path` and the environment.
    ///
    /// # Errors
    /// Returns `HateoasError::Config` if `path` does not exist or any source
    /// fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self, HateoasError> {
        Self::figment(path)?
            .extract()
            .map_err(|e| HateoasError::Config(e.to_string()))
    }

    /// The provider stack [`Self::load`] extracts from.
    ///
    /// # Errors
    /// Returns `HateoasError::Config` if `path` does not exist.
    pub fn figment(path: Option<&Path>) -> Result<Figment, HateoasError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                return Err(HateoasError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Yaml::file(path));
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Directive table described by this configuration.
    ///
    /// The top-level `default_policy`/`caching` pair becomes the global
    /// directive, so `directives` may only hold group and handler entries.
    ///
    /// # Errors
    /// Returns `HateoasError::Config` for a global entry or a missing/extra
    /// group or handler name, `HateoasError::DuplicateDirective` for repeated
    /// targets.
    pub fn directive_table(&self) -> Result<DirectiveTable, HateoasError> {
        let mut table = DirectiveTable::new().with_global(self.default_policy, self.caching)?;

        for entry in &self.directives {
            table = match (entry.scope, entry.group.as_deref(), entry.handler.as_deref()) {
                (Scope::Group, Some(group), None) => {
                    table.with_group(group, entry.policy, entry.caching)?
                }
                (Scope::Handler, Some(group), Some(handler)) => {
                    table.with_handler(group, handler, entry.policy, entry.caching)?
                }
                (Scope::Global, ..) => {
                    return Err(HateoasError::Config(
                        "the global directive is set by `default_policy` and `caching`".to_owned(),
                    ));
                }
                (scope, group, handler) => {
                    return Err(HateoasError::Config(format!(
                        "{scope} directive has an invalid target (group: {}, handler: {})",
                        group.unwrap_or("<none>"),
                        handler.unwrap_or("<none>"),
                    )));
                }
            };
        }

        Ok(table)
    }
}

/// `Option<Duration>` as a humantime string (`"90s"`, `"10m"`).
mod humantime_option {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    #[allow(clippy::ref_option)] // serde requires &T signature
    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&humantime::format_duration(*d).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|raw| humantime::parse_duration(&raw).map_err(de::Error::custom))
            .transpose()
    }
}
