//! Locating cluster credentials and building a client

use crate::utils::errors::{ObuError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where the cluster credentials came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--kubeconfig`
    Explicit(PathBuf),
    /// `KUBECONFIG`
    Environment,
    /// Service account token mounted into a pod
    InCluster,
    /// `~/.kube/config`
    UserHome(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(path) => write!(f, "{}", path.display()),
            Self::Environment => write!(f, "KUBECONFIG"),
            Self::InCluster => write!(f, "in-cluster service account"),
            Self::UserHome(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Resolved credentials plus the namespace they default to
#[derive(Clone)]
pub struct ClusterAccess {
    pub config: Config,
    pub source: ConfigSource,
    /// Namespace of the current context (or the pod's namespace in-cluster)
    pub current_namespace: Option<String>,
}

impl ClusterAccess {
    /// Locate credentials.
    ///
    /// Priority:
    /// 1. explicit path
    /// 2. `KUBECONFIG`
    /// 3. in-cluster service account
    /// 4. `~/.kube/config`
    pub async fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|e| ObuError::Kubeconfig(format!("{}: {}", path.display(), e)))?;
            return Self::from_kubeconfig(kubeconfig, ConfigSource::Explicit(path.to_path_buf()))
                .await;
        }

        if std::env::var_os("KUBECONFIG").is_some_and(|v| !v.is_empty()) {
            match Kubeconfig::from_env() {
                Ok(Some(kubeconfig)) => {
                    return Self::from_kubeconfig(kubeconfig, ConfigSource::Environment).await;
                }
                Ok(None) => {}
                Err(e) => return Err(ObuError::Kubeconfig(format!("KUBECONFIG: {}", e))),
            }
        }

        match Config::incluster() {
            Ok(config) => {
                crate::log_debug!("Using in-cluster configuration");
                let current_namespace = Some(config.default_namespace.clone());
                return Ok(Self {
                    config,
                    source: ConfigSource::InCluster,
                    current_namespace,
                });
            }
            Err(e) => crate::log_debug!("No in-cluster configuration: {}", e),
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".kube").join("config");
            match Kubeconfig::read_from(&path) {
                Ok(kubeconfig) => {
                    match Self::from_kubeconfig(kubeconfig, ConfigSource::UserHome(path)).await {
                        Ok(access) => return Ok(access),
                        Err(e) => crate::log_debug!("Skipping default kubeconfig: {}", e),
                    }
                }
                Err(e) => crate::log_debug!("No kubeconfig at {}: {}", path.display(), e),
            }
        }

        Err(ObuError::KubeconfigNotFound)
    }

    async fn from_kubeconfig(kubeconfig: Kubeconfig, source: ConfigSource) -> Result<Self> {
        crate::log_debug!("Using kubeconfig from {}", source);
        let current_namespace = context_namespace(&kubeconfig);
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| ObuError::Kubeconfig(format!("{}: {}", source, e)))?;

        Ok(Self {
            config,
            source,
            current_namespace,
        })
    }

    /// Build a client for these credentials
    pub fn client(&self) -> Result<Client> {
        Client::try_from(self.config.clone()).map_err(ObuError::Client)
    }
}

/// Namespace set on the current context, if any
pub fn context_namespace(kubeconfig: &Kubeconfig) -> Option<String> {
    let current = kubeconfig.current_context.as_deref()?;
    kubeconfig
        .contexts
        .iter()
        .find(|c| c.name == current)
        .and_then(|c| c.context.as_ref())
        .and_then(|ctx| ctx.namespace.clone())
        .filter(|ns| !ns.is_empty())
}

/// First non-empty of the flag, the current context and the settings fallback
pub fn select_namespace(
    explicit: Option<&str>,
    current: Option<&str>,
    fallback: Option<&str>,
) -> Option<String> {
    [explicit, current, fallback]
        .into_iter()
        .flatten()
        .find(|ns| !ns.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
- name: ocp
  cluster:
    server: https://api.ocp.example:6443
users:
- name: developer
  user:
    token: sha256~token
contexts:
- name: dev
  context:
    cluster: ocp
    user: developer
    namespace: my-project
- name: bare
  context:
    cluster: ocp
    user: developer
"#;

    #[test]
    fn test_context_namespace() {
        let kubeconfig = Kubeconfig::from_yaml(KUBECONFIG).unwrap();
        assert_eq!(context_namespace(&kubeconfig).as_deref(), Some("my-project"));
    }

    #[test]
    fn test_context_without_namespace() {
        let mut kubeconfig = Kubeconfig::from_yaml(KUBECONFIG).unwrap();
        kubeconfig.current_context = Some("bare".to_string());
        assert!(context_namespace(&kubeconfig).is_none());

        kubeconfig.current_context = None;
        assert!(context_namespace(&kubeconfig).is_none());
    }

    #[test]
    fn test_select_namespace_priority() {
        assert_eq!(
            select_namespace(Some("flag"), Some("context"), Some("settings")).as_deref(),
            Some("flag")
        );
        assert_eq!(
            select_namespace(None, Some("context"), Some("settings")).as_deref(),
            Some("context")
        );
        assert_eq!(
            select_namespace(Some(""), None, Some("settings")).as_deref(),
            Some("settings")
        );
        assert!(select_namespace(None, None, None).is_none());
    }

    #[tokio::test]
    async fn test_resolve_explicit_kubeconfig() {
        use std::io::Write;

        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(KUBECONFIG.as_bytes()).unwrap();

        let access = ClusterAccess::resolve(Some(temp.path())).await.unwrap();
        assert_eq!(access.source, ConfigSource::Explicit(temp.path().to_path_buf()));
        assert_eq!(access.current_namespace.as_deref(), Some("my-project"));
        assert_eq!(access.config.cluster_url.host(), Some("api.ocp.example"));
    }

    #[tokio::test]
    async fn test_resolve_missing_explicit_kubeconfig() {
        let result = ClusterAccess::resolve(Some(Path::new("/nonexistent/kubeconfig"))).await;
        assert!(matches!(result, Err(ObuError::Kubeconfig(_))));
    }
}
