//! containers-registries.conf (v2) generation

use crate::k8s::openshift::{ImageConfig, ImageContentSourcePolicy};
use crate::registries::mirrors::merged_mirror_sets;
use crate::utils::errors::{ObuError, Result};
use serde::Serialize;

/// The only registry searched for short names. Builds rely on short names
/// resolving against docker.io alone.
pub const UNQUALIFIED_SEARCH_REGISTRY: &str = "docker.io";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistriesConf {
    #[serde(
        rename = "unqualified-search-registries",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub unqualified_search_registries: Vec<String>,

    #[serde(rename = "registry", skip_serializing_if = "Vec::is_empty")]
    pub registries: Vec<Registry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Registry {
    pub prefix: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub insecure: bool,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub blocked: bool,

    #[serde(
        rename = "mirror-by-digest-only",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub mirror_by_digest_only: bool,

    #[serde(rename = "mirror", skip_serializing_if = "Vec::is_empty")]
    pub mirrors: Vec<Endpoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Endpoint {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub insecure: bool,
}

impl RegistriesConf {
    /// Index of the entry for `scope`, appending a new one if needed
    fn entry_index(&mut self, scope: &str) -> usize {
        if let Some(i) = self.registries.iter().position(|r| r.prefix == scope) {
            return i;
        }
        self.registries.push(Registry {
            prefix: scope.to_string(),
            location: scope.to_string(),
            ..Default::default()
        });
        self.registries.len() - 1
    }

    fn entry(&mut self, scope: &str) -> &mut Registry {
        let i = self.entry_index(scope);
        &mut self.registries[i]
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ObuError::Render(e.to_string()))
    }
}

/// True if `sub` is `sup` itself, a repository below it, or matches a `*.domain` wildcard
pub fn scope_is_nested_inside(sub: &str, sup: &str) -> bool {
    if sub == sup {
        return true;
    }
    if sub.strip_prefix(sup).is_some_and(|rest| rest.starts_with('/')) {
        return true;
    }
    // `*.domain` matches any repository on a host under that domain
    let host = sub.split('/').next().unwrap_or(sub);
    if let Some(domain) = sup.strip_prefix('*')
        && domain.starts_with('.')
        && host.ends_with(domain)
    {
        return true;
    }
    false
}

/// Apply insecure and blocked scopes and mirror rules to `config` in place.
///
/// Scopes can be whole registries or repositories within a registry.
pub fn edit_registries_config(
    config: &mut RegistriesConf,
    insecure_scopes: &[String],
    blocked_scopes: &[String],
    policies: &[ImageContentSourcePolicy],
) -> Result<()> {
    for set in merged_mirror_sets(policies)? {
        let registry = config.entry(&set.source);
        registry.mirror_by_digest_only = true;
        registry
            .mirrors
            .extend(set.mirrors.into_iter().map(|location| Endpoint {
                location,
                insecure: false,
            }));
    }

    for scope in insecure_scopes {
        config.entry(scope).insecure = true;
    }
    for scope in blocked_scopes {
        config.entry(scope).blocked = true;
    }

    let is_insecure = |location: &str| {
        insecure_scopes
            .iter()
            .any(|scope| scope_is_nested_inside(location, scope))
    };
    let is_blocked = |prefix: &str| {
        blocked_scopes
            .iter()
            .any(|scope| scope_is_nested_inside(prefix, scope))
    };

    for registry in &mut config.registries {
        for mirror in &mut registry.mirrors {
            if is_insecure(&mirror.location) {
                mirror.insecure = true;
            }
        }
        if is_insecure(&registry.location) {
            registry.insecure = true;
        }
        if is_blocked(&registry.prefix) {
            registry.blocked = true;
        }
    }

    Ok(())
}

/// Build the registries.conf used by image builds.
///
/// Returns an empty string when the cluster configures no insecure or blocked
/// registries and no mirrors.
pub fn build_registries_config(
    image_config: Option<&ImageConfig>,
    policies: &[ImageContentSourcePolicy],
) -> Result<String> {
    let (insecure, blocked) = image_config
        .map(|c| {
            (
                c.spec.registry_sources.insecure_registries.as_slice(),
                c.spec.registry_sources.blocked_registries.as_slice(),
            )
        })
        .unwrap_or_default();

    if insecure.is_empty() && blocked.is_empty() && policies.is_empty() {
        return Ok(String::new());
    }

    let mut config = RegistriesConf {
        unqualified_search_registries: vec![UNQUALIFIED_SEARCH_REGISTRY.to_string()],
        ..Default::default()
    };
    edit_registries_config(&mut config, insecure, blocked, policies)?;

    config.to_toml()
}
