//! `obu registry`: internal image registry trust and credentials

use super::{CONTROLLER_MANAGER_NAMESPACE, ca_bundle, usage_hint};
use crate::config::settings::{RegistrySettings, Settings};
use crate::k8s::client::select_namespace;
use crate::k8s::{ClusterApi, LazyCluster};
use crate::registries::docker_config::PullSecret;
use crate::utils::errors::{ObuError, Result};
use k8s_openapi::api::core::v1::Secret;
use std::io::Write;
use std::path::Path;

/// Config map holding the service CA that signs the registry's serving cert
pub const SERVICE_CA_CONFIG_MAP: &str = "openshift-service-ca";
pub const SERVICE_CA_KEY: &str = "service-ca.crt";

/// What `obu registry` prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrySelection {
    CaData,
    DockerCfgFile,
}

pub async fn execute(
    kubeconfig: Option<&Path>,
    settings: &Settings,
    selection: Option<RegistrySelection>,
    namespace: Option<String>,
) -> Result<()> {
    let cluster = LazyCluster::new(kubeconfig);
    let mut buf = Vec::new();
    run(&cluster, settings, selection, namespace.as_deref(), &mut buf).await?;
    super::emit(&buf)
}

/// Write what `selection` asks for, or the usage hint without reading anything
pub async fn run(
    cluster: &impl ClusterApi,
    settings: &Settings,
    selection: Option<RegistrySelection>,
    namespace: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    match selection {
        None => usage_hint(out),
        Some(RegistrySelection::CaData) => write_service_ca(cluster, out).await,
        Some(RegistrySelection::DockerCfgFile) => {
            let current = cluster.current_namespace().await?;
            let namespace = select_namespace(
                namespace,
                current.as_deref(),
                settings.defaults.namespace.as_deref(),
            )
            .ok_or(ObuError::NoNamespace("registry secrets"))?;
            write_builder_docker_cfg(cluster, &namespace, &settings.registry, out).await
        }
    }
}

/// Write the service CA bundle used to trust the internal registry
pub async fn write_service_ca(cluster: &impl ClusterApi, out: &mut impl Write) -> Result<()> {
    let config_map = cluster
        .config_map(CONTROLLER_MANAGER_NAMESPACE, SERVICE_CA_CONFIG_MAP)
        .await?;
    out.write_all(ca_bundle(&config_map, SERVICE_CA_KEY, "registry")?.as_bytes())?;
    Ok(())
}

/// Write the builder service account's internal registry pull secret
pub async fn write_builder_docker_cfg(
    cluster: &impl ClusterApi,
    namespace: &str,
    registry: &RegistrySettings,
    out: &mut impl Write,
) -> Result<()> {
    let pull_secret = find_builder_pull_secret(
        cluster,
        namespace,
        &registry.service_account,
        &registry.internal_host_prefix,
    )
    .await?;
    out.write_all(pull_secret.to_pretty_json()?.as_bytes())?;
    Ok(())
}

/// First docker secret linked to `service_account` with a host under `host_prefix`
pub async fn find_builder_pull_secret(
    cluster: &impl ClusterApi,
    namespace: &str,
    service_account: &str,
    host_prefix: &str,
) -> Result<PullSecret> {
    let account = cluster.service_account(namespace, service_account).await?;

    let mut secrets = Vec::new();
    for name in account
        .secrets
        .iter()
        .flatten()
        .filter_map(|reference| reference.name.as_deref())
    {
        secrets.push(cluster.secret(namespace, name).await?);
    }

    for secret in &secrets {
        if let Some(pull_secret) = registry_pull_secret(secret, host_prefix)? {
            crate::log_info!(
                "Using secret {} from service account {}",
                secret.metadata.name.as_deref().unwrap_or_default(),
                service_account
            );
            return Ok(pull_secret);
        }
    }

    Err(ObuError::NoRegistrySecret(service_account.to_string()))
}

/// Decode `secret` if it is a docker secret for a host under `host_prefix`.
///
/// Secrets of other types, and docker secrets for other hosts, yield `None`.
pub fn registry_pull_secret(secret: &Secret, host_prefix: &str) -> Result<Option<PullSecret>> {
    let Some(secret_type) = secret.type_.as_deref() else {
        return Ok(None);
    };
    let Some(key) = PullSecret::data_key(secret_type) else {
        return Ok(None);
    };

    let name = secret.metadata.name.as_deref().unwrap_or_default();
    let data = secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .ok_or_else(|| {
            ObuError::MissingData(format!("No data at key {} for secret {}", key, name))
        })?;

    let pull_secret = PullSecret::decode(secret_type, &data.0, name)?;
    if !pull_secret.has_host_with_prefix(host_prefix) {
        crate::log_debug!("Secret {} has no {} host", name, host_prefix);
        return Ok(None);
    }
    Ok(Some(pull_secret))
}
