//! `obu mirror`: registry mirror trust and registries.conf

use super::usage_hint;
use crate::k8s::openshift::ImageConfig;
use crate::k8s::{ClusterApi, LazyCluster};
use crate::registries::conf::build_registries_config;
use crate::utils::errors::{ObuError, Result};
use std::io::Write;
use std::path::Path;

/// Namespace holding user supplied cluster configuration
pub const OPENSHIFT_CONFIG_NAMESPACE: &str = "openshift-config";

/// What `obu mirror` prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorSelection {
    CaData,
    DockerCfgFile,
}

pub async fn execute(kubeconfig: Option<&Path>, selection: Option<MirrorSelection>) -> Result<()> {
    let cluster = LazyCluster::new(kubeconfig);
    let mut buf = Vec::new();
    run(&cluster, selection, &mut buf).await?;
    super::emit(&buf)
}

/// Write what `selection` asks for, or the usage hint without reading anything
pub async fn run(
    cluster: &impl ClusterApi,
    selection: Option<MirrorSelection>,
    out: &mut impl Write,
) -> Result<()> {
    let Some(selection) = selection else {
        return usage_hint(out);
    };

    let image_config = cluster.image_config().await?;

    match selection {
        MirrorSelection::CaData => write_additional_trusted_ca(cluster, &image_config, out).await,
        MirrorSelection::DockerCfgFile => {
            let policies = cluster.image_content_source_policies().await?;
            for policy in &policies {
                crate::log_debug!(
                    "Found image content source policy {}",
                    policy.metadata.name.as_deref().unwrap_or_default()
                );
            }
            let conf = build_registries_config(Some(&image_config), &policies)?;
            out.write_all(conf.as_bytes())?;
            Ok(())
        }
    }
}

/// Write every CA in the config map the image config names, ordered by key
async fn write_additional_trusted_ca(
    cluster: &impl ClusterApi,
    image_config: &ImageConfig,
    out: &mut impl Write,
) -> Result<()> {
    let name = &image_config.spec.additional_trusted_ca.name;
    if name.is_empty() {
        return Err(ObuError::MissingData(
            "mirror CA data has not been set, the image config names no additionalTrustedCA config map"
                .to_string(),
        ));
    }

    let config_map = cluster.config_map(OPENSHIFT_CONFIG_NAMESPACE, name).await?;
    for (key, value) in config_map.data.iter().flatten() {
        crate::log_debug!("Writing CA data from key {}", key);
        out.write_all(value.as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::openshift::{
        ImageContentSourcePolicy, ImageContentSourcePolicySpec, RepositoryDigestMirrors,
    };
    use serde_json::json;

    fn cluster(trusted_ca: &str) -> crate::commands::fake::FakeCluster {
        let mut cluster = crate::commands::fake::FakeCluster {
            image_config: Some(
                serde_json::from_value(json!({"spec": {
                    "additionalTrustedCA": {"name": trusted_ca},
                    "registrySources": {"insecureRegistries": ["insecure.corp"]}
                }}))
                .unwrap(),
            ),
            ..Default::default()
        };
        cluster.add_config_map(
            OPENSHIFT_CONFIG_NAMESPACE,
            "registry-cas",
            &[("b.corp", "CA-B\n"), ("a.corp", "CA-A\n")],
        );
        cluster
    }

    fn policy(source: &str, mirrors: &[&str]) -> ImageContentSourcePolicy {
        ImageContentSourcePolicy {
            spec: ImageContentSourcePolicySpec {
                repository_digest_mirrors: vec![RepositoryDigestMirrors {
                    source: source.to_string(),
                    mirrors: mirrors.iter().map(|m| m.to_string()).collect(),
                }],
            },
            ..Default::default()
        }
    }

    async fn output(
        cluster: &crate::commands::fake::FakeCluster,
        selection: MirrorSelection,
    ) -> Result<String> {
        let mut out = Vec::new();
        run(cluster, Some(selection), &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_ca_data_is_concatenated_by_key() {
        let text = output(&cluster("registry-cas"), MirrorSelection::CaData)
            .await
            .unwrap();
        assert_eq!(text, "CA-A\nCA-B\n");
    }

    #[tokio::test]
    async fn test_ca_data_without_configured_name() {
        let cluster = cluster("");
        let err = output(&cluster, MirrorSelection::CaData).await.unwrap_err();
        assert!(err.to_string().contains("additionalTrustedCA"));
        // Only the image config was read
        assert_eq!(cluster.calls.get(), 1);
    }

    #[tokio::test]
    async fn test_ca_data_missing_config_map() {
        let err = output(&cluster("gone"), MirrorSelection::CaData)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("openshift-config/gone"));
    }

    #[tokio::test]
    async fn test_docker_cfg_file() {
        let mut cluster = cluster("registry-cas");
        cluster.policies = vec![policy("quay.io/openshift", &["mirror.corp/openshift"])];

        let text = output(&cluster, MirrorSelection::DockerCfgFile).await.unwrap();
        let table: toml::Table = toml::from_str(&text).unwrap();

        let registries = table["registry"].as_array().unwrap();
        assert_eq!(registries.len(), 2);
        assert_eq!(registries[0]["prefix"].as_str(), Some("quay.io/openshift"));
        assert_eq!(
            registries[0]["mirror"][0]["location"].as_str(),
            Some("mirror.corp/openshift")
        );
        assert_eq!(registries[1]["insecure"].as_bool(), Some(true));
    }

    #[tokio::test]
    async fn test_missing_image_config() {
        let cluster = crate::commands::fake::FakeCluster::default();
        let mut out = Vec::new();
        assert!(
            run(&cluster, Some(MirrorSelection::DockerCfgFile), &mut out)
                .await
                .is_err()
        );
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_no_selection_prints_usage_hint_only() {
        let cluster = cluster("registry-cas");
        let mut out = Vec::new();
        run(&cluster, None, &mut out).await.unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), crate::commands::USAGE_HINT);
        assert_eq!(cluster.calls.get(), 0);
    }
}
