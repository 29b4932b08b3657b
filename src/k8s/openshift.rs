//! Read-only records for the OpenShift API objects obu inspects
//!
//! Only the fields obu reads are modelled; everything else in the objects is
//! ignored on decode.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::{ApiResource, GroupVersionKind};
use serde::Deserialize;

/// Tag reference policy that pulls through the integrated registry
pub const LOCAL_REFERENCE_POLICY: &str = "Local";

/// `from.kind` of a tag that points at another tag
pub const IMAGE_STREAM_TAG_KIND: &str = "ImageStreamTag";

/// image.openshift.io/v1 ImageStream
pub fn image_stream_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("image.openshift.io", "v1", "ImageStream"),
        "imagestreams",
    )
}

/// config.openshift.io/v1 Proxy
pub fn proxy_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("config.openshift.io", "v1", "Proxy"),
        "proxies",
    )
}

/// config.openshift.io/v1 Image
pub fn image_config_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("config.openshift.io", "v1", "Image"),
        "images",
    )
}

/// operator.openshift.io/v1alpha1 ImageContentSourcePolicy
pub fn image_content_source_policy_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("operator.openshift.io", "v1alpha1", "ImageContentSourcePolicy"),
        "imagecontentsourcepolicies",
    )
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageStream {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ImageStreamSpec,
    #[serde(default)]
    pub status: ImageStreamStatus,
}

impl ImageStream {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    /// The spec entry for `tag`, if any
    pub fn spec_tag(&self, tag: &str) -> Option<&TagReference> {
        self.spec.tags.iter().find(|t| t.name == tag)
    }

    /// The status history for `tag`, if any
    pub fn status_tag(&self, tag: &str) -> Option<&NamedTagEventList> {
        self.status.tags.iter().find(|t| t.tag == tag)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamSpec {
    #[serde(default)]
    pub tags: Vec<TagReference>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagReference {
    pub name: String,
    #[serde(default)]
    pub from: Option<TagSource>,
    #[serde(default)]
    pub reference_policy: TagReferencePolicy,
}

/// The object a spec tag points at
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagSource {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagReferencePolicy {
    /// `Source` or `Local`; empty means `Source`
    #[serde(rename = "type", default)]
    pub type_: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamStatus {
    #[serde(default)]
    pub docker_image_repository: String,
    #[serde(default)]
    pub tags: Vec<NamedTagEventList>,
}

/// Tag history, newest event first
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedTagEventList {
    pub tag: String,
    #[serde(default)]
    pub items: Vec<TagEvent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagEvent {
    #[serde(default)]
    pub docker_image_reference: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub generation: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Proxy {
    #[serde(default)]
    pub status: ProxyStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyStatus {
    #[serde(default)]
    pub http_proxy: String,
    #[serde(default)]
    pub https_proxy: String,
    #[serde(default)]
    pub no_proxy: String,
}

/// The cluster-wide image configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub spec: ImageConfigSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfigSpec {
    #[serde(rename = "additionalTrustedCA", default)]
    pub additional_trusted_ca: ConfigMapNameReference,
    #[serde(default)]
    pub registry_sources: RegistrySources,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigMapNameReference {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySources {
    #[serde(default)]
    pub insecure_registries: Vec<String>,
    #[serde(default)]
    pub blocked_registries: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageContentSourcePolicy {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ImageContentSourcePolicySpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContentSourcePolicySpec {
    #[serde(default)]
    pub repository_digest_mirrors: Vec<RepositoryDigestMirrors>,
}

/// One source repository and the mirrors that may serve it
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RepositoryDigestMirrors {
    pub source: String,
    #[serde(default)]
    pub mirrors: Vec<String>,
}
