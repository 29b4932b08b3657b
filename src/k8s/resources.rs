//! Typed accessors for the cluster objects obu reads

use crate::k8s::client::ClusterAccess;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use crate::k8s::openshift::{
    self, ImageConfig, ImageContentSourcePolicy, ImageStream, Proxy,
};
use crate::utils::errors::{ObuError, Result};
use k8s_openapi::api::core::v1::{ConfigMap, Secret, ServiceAccount};
use kube::api::{Api, ListParams};
use kube::core::{ApiResource, DynamicObject};
use kube::Client;
use serde::de::DeserializeOwned;

/// Name of the singleton cluster configuration objects
pub const CLUSTER_SINGLETON: &str = "cluster";

/// Read access to the objects the commands need
#[allow(async_fn_in_trait)]
pub trait ClusterApi {
    async fn image_stream(&self, namespace: &str, name: &str) -> Result<ImageStream>;

    /// The cluster-wide proxy configuration
    async fn proxy(&self) -> Result<Proxy>;

    /// The cluster-wide image configuration
    async fn image_config(&self) -> Result<ImageConfig>;

    async fn image_content_source_policies(&self) -> Result<Vec<ImageContentSourcePolicy>>;

    async fn config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap>;

    async fn secret(&self, namespace: &str, name: &str) -> Result<Secret>;

    async fn service_account(&self, namespace: &str, name: &str) -> Result<ServiceAccount>;

    /// Namespace of the current context, if the credentials carry one
    async fn current_namespace(&self) -> Result<Option<String>>;
}

/// A live cluster
#[derive(Clone)]
pub struct Cluster {
    client: Client,
    current_namespace: Option<String>,
}

impl Cluster {
    pub fn new(client: Client, current_namespace: Option<String>) -> Self {
        Self {
            client,
            current_namespace,
        }
    }

    /// Build a client from resolved credentials
    pub fn connect(access: &ClusterAccess) -> Result<Self> {
        crate::log_info!("Connecting to {}", access.config.cluster_url);
        Ok(Self::new(access.client()?, access.current_namespace.clone()))
    }

    async fn get_dynamic<T: DeserializeOwned>(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<T> {
        let what = describe(resource, namespace, name);
        crate::log_debug!("Fetching {}", what);

        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, resource),
            None => Api::all_with(self.client.clone(), resource),
        };
        let object = api
            .get(name)
            .await
            .map_err(|source| ObuError::Fetch { what: what.clone(), source })?;

        decode(object, &what)
    }
}

impl ClusterApi for Cluster {
    async fn image_stream(&self, namespace: &str, name: &str) -> Result<ImageStream> {
        self.get_dynamic(&openshift::image_stream_resource(), Some(namespace), name)
            .await
    }

    async fn proxy(&self) -> Result<Proxy> {
        self.get_dynamic(&openshift::proxy_resource(), None, CLUSTER_SINGLETON)
            .await
    }

    async fn image_config(&self) -> Result<ImageConfig> {
        self.get_dynamic(&openshift::image_config_resource(), None, CLUSTER_SINGLETON)
            .await
    }

    async fn image_content_source_policies(&self) -> Result<Vec<ImageContentSourcePolicy>> {
        let resource = openshift::image_content_source_policy_resource();
        let what = format!("{} list", resource.kind);
        crate::log_debug!("Fetching {}", what);

        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|source| ObuError::Fetch { what: what.clone(), source })?;

        list.items
            .into_iter()
            .map(|object| decode(object, &what))
            .collect()
    }

    async fn config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap> {
        crate::log_debug!("Fetching config map {}/{}", namespace, name);
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(|source| ObuError::Fetch {
            what: format!("config map {}/{}", namespace, name),
            source,
        })
    }

    async fn secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        crate::log_debug!("Fetching secret {}/{}", namespace, name);
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(|source| ObuError::Fetch {
            what: format!("secret {}/{}", namespace, name),
            source,
        })
    }

    async fn service_account(&self, namespace: &str, name: &str) -> Result<ServiceAccount> {
        crate::log_debug!("Fetching service account {}/{}", namespace, name);
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(|source| ObuError::Fetch {
            what: format!("service account {}/{}", namespace, name),
            source,
        })
    }

    async fn current_namespace(&self) -> Result<Option<String>> {
        Ok(self.current_namespace.clone())
    }
}

/// A cluster that resolves credentials and connects on its first read.
///
/// Commands that end up reading nothing never touch the kubeconfig.
pub struct LazyCluster {
    kubeconfig: Option<PathBuf>,
    cluster: OnceCell<Cluster>,
}

impl LazyCluster {
    pub fn new(kubeconfig: Option<&Path>) -> Self {
        Self {
            kubeconfig: kubeconfig.map(Path::to_path_buf),
            cluster: OnceCell::new(),
        }
    }

    async fn get(&self) -> Result<&Cluster> {
        self.cluster
            .get_or_try_init(|| async {
                let access = ClusterAccess::resolve(self.kubeconfig.as_deref()).await?;
                Cluster::connect(&access)
            })
            .await
    }
}

impl ClusterApi for LazyCluster {
    async fn image_stream(&self, namespace: &str, name: &str) -> Result<ImageStream> {
        self.get().await?.image_stream(namespace, name).await
    }

    async fn proxy(&self) -> Result<Proxy> {
        self.get().await?.proxy().await
    }

    async fn image_config(&self) -> Result<ImageConfig> {
        self.get().await?.image_config().await
    }

    async fn image_content_source_policies(&self) -> Result<Vec<ImageContentSourcePolicy>> {
        self.get().await?.image_content_source_policies().await
    }

    async fn config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap> {
        self.get().await?.config_map(namespace, name).await
    }

    async fn secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        self.get().await?.secret(namespace, name).await
    }

    async fn service_account(&self, namespace: &str, name: &str) -> Result<ServiceAccount> {
        self.get().await?.service_account(namespace, name).await
    }

    async fn current_namespace(&self) -> Result<Option<String>> {
        self.get().await?.current_namespace().await
    }
}

fn describe(resource: &ApiResource, namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{} {}/{}", resource.kind, ns, name),
        None => format!("{} {}", resource.kind, name),
    }
}

/// Convert a dynamically fetched object into its typed record
fn decode<T: DeserializeOwned>(object: DynamicObject, what: &str) -> Result<T> {
    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(|e| ObuError::MissingData(format!("unexpected content in {}: {}", what, e)))
}
