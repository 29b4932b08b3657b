//! `obu translate`: image stream tag to pullable image reference

use crate::config::settings::Settings;
use crate::image::reference::split_stream_tag;
use crate::image::resolve::{
    ResolutionMode, latest_generation_reference, resolve_latest_tagged_image, source_reference,
};
use crate::k8s::openshift::ImageStream;
use crate::k8s::client::select_namespace;
use crate::k8s::{ClusterApi, LazyCluster};
use crate::utils::errors::{ObuError, Result};
use std::io::Write;
use std::path::Path;

/// Options for the translate command
pub struct TranslateOptions {
    /// `<stream>:<tag>`
    pub reference: String,
    pub namespace: Option<String>,
    pub mode: ResolutionMode,
}

/// Translate against the cluster and print the result
pub async fn execute(
    kubeconfig: Option<&Path>,
    settings: &Settings,
    options: TranslateOptions,
) -> Result<()> {
    // Reject malformed references before touching the cluster
    split_stream_tag(&options.reference)?;

    let cluster = LazyCluster::new(kubeconfig);
    let current = cluster.current_namespace().await?;
    let namespace = select_namespace(
        options.namespace.as_deref(),
        current.as_deref(),
        settings.defaults.namespace.as_deref(),
    )
    .ok_or(ObuError::NoNamespace("image streams"))?;

    let mut buf = Vec::new();
    run(&cluster, &namespace, &options.reference, options.mode, &mut buf).await?;
    super::emit(&buf)
}

/// Fetch the stream named by `reference` and write the translated reference
pub async fn run(
    cluster: &impl ClusterApi,
    namespace: &str,
    reference: &str,
    mode: ResolutionMode,
    out: &mut impl Write,
) -> Result<()> {
    let (stream_name, tag) = split_stream_tag(reference)?;
    let stream = cluster.image_stream(namespace, stream_name).await?;

    let translated = translate(&stream, reference, tag, mode)?;
    crate::log_info!("{} resolved to {}", reference, translated);
    write!(out, "{}", translated)?;
    Ok(())
}

/// Pick the reference for `tag` according to `mode`
pub fn translate(
    stream: &ImageStream,
    reference: &str,
    tag: &str,
    mode: ResolutionMode,
) -> Result<String> {
    let tag_reference_error = |e: crate::image::resolve::TagReferenceError| ObuError::TagReference {
        reference: reference.to_string(),
        reason: e.to_string(),
    };

    match mode {
        ResolutionMode::LocalPolicy => resolve_latest_tagged_image(stream, tag)
            .ok_or_else(|| ObuError::Unresolvable(reference.to_string())),
        ResolutionMode::Source => source_reference(stream, tag).map_err(tag_reference_error),
        ResolutionMode::SourceDigest => {
            // The chain must still be valid even though the digest comes from status
            source_reference(stream, tag).map_err(tag_reference_error)?;
            latest_generation_reference(stream, tag)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| ObuError::Unresolvable(reference.to_string()))
        }
    }
}
