//! `obu proxy`: the cluster-wide proxy settings

use super::{CONTROLLER_MANAGER_NAMESPACE, ca_bundle, usage_hint};
use crate::k8s::openshift::ProxyStatus;
use crate::k8s::{ClusterApi, LazyCluster};
use crate::utils::errors::Result;
use std::io::Write;
use std::path::Path;

/// Config map the controller manager publishes the proxy trust bundle in
pub const GLOBAL_CA_CONFIG_MAP: &str = "openshift-global-ca";
pub const GLOBAL_CA_KEY: &str = "ca-bundle.crt";

/// What `obu proxy` prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxySelection {
    HttpProxy,
    HttpsProxy,
    NoProxy,
    EnvVars,
    CaData,
}

pub async fn execute(kubeconfig: Option<&Path>, selection: Option<ProxySelection>) -> Result<()> {
    let cluster = LazyCluster::new(kubeconfig);
    let mut buf = Vec::new();
    run(&cluster, selection, &mut buf).await?;
    super::emit(&buf)
}

/// Write what `selection` asks for, or the usage hint without reading anything
pub async fn run(
    cluster: &impl ClusterApi,
    selection: Option<ProxySelection>,
    out: &mut impl Write,
) -> Result<()> {
    let Some(selection) = selection else {
        return usage_hint(out);
    };

    if selection == ProxySelection::CaData {
        let config_map = cluster
            .config_map(CONTROLLER_MANAGER_NAMESPACE, GLOBAL_CA_CONFIG_MAP)
            .await?;
        out.write_all(ca_bundle(&config_map, GLOBAL_CA_KEY, "proxy")?.as_bytes())?;
        return Ok(());
    }

    let proxy = cluster.proxy().await?;
    render_status(&proxy.status, selection, out)
}

/// Write the proxy fields `selection` asks for
pub fn render_status(
    status: &ProxyStatus,
    selection: ProxySelection,
    out: &mut impl Write,
) -> Result<()> {
    match selection {
        ProxySelection::HttpProxy => write!(out, "{}", status.http_proxy)?,
        ProxySelection::HttpsProxy => write!(out, "{}", status.https_proxy)?,
        ProxySelection::NoProxy => write!(out, "{}", status.no_proxy)?,
        ProxySelection::EnvVars => {
            for (name, value) in [
                ("HTTPS_PROXY", &status.https_proxy),
                ("HTTP_PROXY", &status.http_proxy),
                ("NO_PROXY", &status.no_proxy),
            ] {
                writeln!(out, "{}={}", name, value)?;
            }
            for (name, value) in [
                ("https_proxy", &status.https_proxy),
                ("http_proxy", &status.http_proxy),
                ("no_proxy", &status.no_proxy),
            ] {
                writeln!(out, "{}={}", name, value)?;
            }
        }
        // Served from the config map, nothing in the proxy status
        ProxySelection::CaData => {}
    }
    Ok(())
}
