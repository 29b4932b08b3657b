//! Docker registry credential files found in pull secrets
//!
//! Two payload formats exist: the legacy `.dockercfg` (a bare host map) and
//! `.dockerconfigjson` (the host map under `auths`).

use crate::utils::errors::{ObuError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Secret type holding a legacy `.dockercfg` payload
pub const SECRET_TYPE_DOCKERCFG: &str = "kubernetes.io/dockercfg";
/// Secret type holding a `.dockerconfigjson` payload
pub const SECRET_TYPE_DOCKER_CONFIG_JSON: &str = "kubernetes.io/dockerconfigjson";

pub const DOCKERCFG_KEY: &str = ".dockercfg";
pub const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";

/// Registry host to credentials
pub type DockerConfig = BTreeMap<String, DockerConfigEntry>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DockerConfigEntry {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
    /// base64 `username:password`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DockerConfigJson {
    pub auths: DockerConfig,
    #[serde(
        rename = "HttpHeaders",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub http_headers: Option<BTreeMap<String, String>>,
}

/// A decoded pull secret payload
#[derive(Debug, Clone, PartialEq)]
pub enum PullSecret {
    Dockercfg(DockerConfig),
    DockerConfigJson(DockerConfigJson),
}

impl PullSecret {
    /// The data key that carries the payload for a secret type, if it is a pull secret type
    pub fn data_key(secret_type: &str) -> Option<&'static str> {
        match secret_type {
            SECRET_TYPE_DOCKERCFG => Some(DOCKERCFG_KEY),
            SECRET_TYPE_DOCKER_CONFIG_JSON => Some(DOCKER_CONFIG_JSON_KEY),
            _ => None,
        }
    }

    /// Decode `data` for the given secret type; `secret` names it in errors
    pub fn decode(secret_type: &str, data: &[u8], secret: &str) -> Result<Self> {
        let decode_error = |key: &str, e: serde_json::Error| ObuError::Decode {
            key: key.to_string(),
            secret: secret.to_string(),
            reason: e.to_string(),
        };

        match secret_type {
            SECRET_TYPE_DOCKERCFG => serde_json::from_slice(data)
                .map(Self::Dockercfg)
                .map_err(|e| decode_error(DOCKERCFG_KEY, e)),
            SECRET_TYPE_DOCKER_CONFIG_JSON => serde_json::from_slice(data)
                .map(Self::DockerConfigJson)
                .map_err(|e| decode_error(DOCKER_CONFIG_JSON_KEY, e)),
            other => Err(ObuError::MissingData(format!(
                "Secret {} has type {} which is not a docker config secret",
                secret, other
            ))),
        }
    }

    pub fn auths(&self) -> &DockerConfig {
        match self {
            Self::Dockercfg(auths) => auths,
            Self::DockerConfigJson(config) => &config.auths,
        }
    }

    /// True if any host starts with `prefix`
    pub fn has_host_with_prefix(&self, prefix: &str) -> bool {
        self.auths().keys().any(|host| host.starts_with(prefix))
    }

    /// Re-encode as tab indented JSON
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);

        let written = match self {
            Self::Dockercfg(auths) => auths.serialize(&mut ser),
            Self::DockerConfigJson(config) => config.serialize(&mut ser),
        };
        written.map_err(|e| ObuError::Render(e.to_string()))?;

        String::from_utf8(buf).map_err(|e| ObuError::Render(e.to_string()))
    }
}
