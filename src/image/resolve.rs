//! Turning an image stream tag into a pullable reference

use crate::image::reference::{DEFAULT_IMAGE_TAG, DockerImageReference};
use crate::k8s::openshift::{
    IMAGE_STREAM_TAG_KIND, ImageStream, LOCAL_REFERENCE_POLICY, TagEvent, TagReference,
};
use std::collections::HashSet;
use thiserror::Error;

/// How `translate` picks the reference it prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Honor the tag's reference policy (pull through the internal registry if `Local`)
    LocalPolicy,
    /// Follow the tag chain and return the source image name
    Source,
    /// Follow the tag chain and return the digest of the newest generation
    SourceDigest,
}

/// Why a tag reference chain could not be followed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagReferenceError {
    #[error("tag {0} is not defined in the image stream spec")]
    NotFound(String),

    #[error("tag {0} is part of a circular tag reference")]
    Circular(String),

    #[error("tag reference {0} is not a valid image stream tag")]
    Invalid(String),

    #[error("tag reference {0} points to another image stream")]
    CrossImageStream(String),

    #[error("tag {0} has no tag references")]
    NoSource(String),
}

/// The newest status event recorded for `tag`
pub fn latest_tagged_image<'a>(stream: &'a ImageStream, tag: &str) -> Option<&'a TagEvent> {
    stream.status_tag(tag).and_then(|t| t.items.first())
}

/// Resolve `tag` through its reference policy.
///
/// With a `Local` policy the image is addressed by digest through the stream's
/// internal repository; otherwise (or when that repository is unknown) the
/// originating reference of the newest event is used.
pub fn resolve_latest_tagged_image(stream: &ImageStream, tag: &str) -> Option<String> {
    let latest = latest_tagged_image(stream, tag)?;

    let Some(spec_tag) = stream.spec_tag(tag) else {
        return Some(latest.docker_image_reference.clone());
    };

    if spec_tag.reference_policy.type_ != LOCAL_REFERENCE_POLICY {
        return Some(latest.docker_image_reference.clone());
    }

    let local = &stream.status.docker_image_repository;
    if local.is_empty() || latest.image.is_empty() {
        return Some(latest.docker_image_reference.clone());
    }

    let resolved = match DockerImageReference::parse(local) {
        Some(reference) => reference.with_digest(&latest.image).to_string(),
        None => latest.docker_image_reference.clone(),
    };
    Some(resolved)
}

/// Follow `tag` through `ImageStreamTag` references within the same stream.
///
/// Returns the name of the terminating tag and its spec entry.
pub fn follow_tag_reference<'a>(
    stream: &'a ImageStream,
    tag: &str,
) -> Result<(String, &'a TagReference), TagReferenceError> {
    let mut seen = HashSet::new();
    let mut current = tag.to_string();

    loop {
        if !seen.insert(current.clone()) {
            return Err(TagReferenceError::Circular(current));
        }

        let tag_ref = stream
            .spec_tag(&current)
            .ok_or_else(|| TagReferenceError::NotFound(current.clone()))?;

        let from = match &tag_ref.from {
            Some(from) if from.kind == IMAGE_STREAM_TAG_KIND => from,
            _ => return Ok((current, tag_ref)),
        };

        if let Some(namespace) = from.namespace.as_deref().filter(|ns| !ns.is_empty())
            && Some(namespace) != stream.metadata.namespace.as_deref()
        {
            return Err(TagReferenceError::CrossImageStream(format!(
                "{}/{}",
                namespace, from.name
            )));
        }

        // Either `sometag` or `samestream:sometag`
        current = match from.name.rsplit_once(':') {
            Some((name, next)) => {
                if name.is_empty() {
                    return Err(TagReferenceError::Invalid(from.name.clone()));
                }
                if name != stream.name() {
                    return Err(TagReferenceError::CrossImageStream(from.name.clone()));
                }
                if next.is_empty() {
                    DEFAULT_IMAGE_TAG.to_string()
                } else {
                    next.to_string()
                }
            }
            None => from.name.clone(),
        };
    }
}

/// The source image name a tag ultimately points at
pub fn source_reference(stream: &ImageStream, tag: &str) -> Result<String, TagReferenceError> {
    let (final_tag, tag_ref) = follow_tag_reference(stream, tag)?;
    tag_ref
        .from
        .as_ref()
        .map(|from| from.name.clone())
        .filter(|name| !name.is_empty())
        .ok_or(TagReferenceError::NoSource(final_tag))
}

/// The reference of the status item with the highest generation for `tag`.
///
/// When several items share the highest generation the first one wins.
pub fn latest_generation_reference(stream: &ImageStream, tag: &str) -> Option<String> {
    let mut latest: Option<&TagEvent> = None;

    for event in stream
        .status
        .tags
        .iter()
        .filter(|t| t.tag == tag)
        .flat_map(|t| t.items.iter())
    {
        if latest.is_none_or(|current| event.generation > current.generation) {
            latest = Some(event);
        }
    }

    latest.map(|event| event.docker_image_reference.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stream(value: serde_json::Value) -> ImageStream {
        serde_json::from_value(value).unwrap()
    }

    fn nodejs_stream(policy: &str) -> ImageStream {
        stream(json!({
            "metadata": {"name": "nodejs", "namespace": "ns"},
            "spec": {"tags": [{
                "name": "12",
                "from": {"kind": "DockerImage", "name": "registry.example/nodejs:12"},
                "referencePolicy": {"type": policy}
            }]},
            "status": {
                "dockerImageRepository": "image-registry.example/ns/nodejs",
                "tags": [{"tag": "12", "items": [
                    {"dockerImageReference": "registry.example/nodejs@sha256:abc", "image": "sha256:abc", "generation": 2},
                    {"dockerImageReference": "registry.example/nodejs@sha256:old", "image": "sha256:old", "generation": 1}
                ]}]
            }
        }))
    }

    #[test]
    fn test_local_policy_uses_internal_repository() {
        let resolved = resolve_latest_tagged_image(&nodejs_stream("Local"), "12").unwrap();
        assert_eq!(resolved, "image-registry.example/ns/nodejs@sha256:abc");
    }

    #[test]
    fn test_source_policy_uses_newest_event() {
        let resolved = resolve_latest_tagged_image(&nodejs_stream("Source"), "12").unwrap();
        assert_eq!(resolved, "registry.example/nodejs@sha256:abc");
    }

    #[test]
    fn test_local_policy_without_repository_falls_back() {
        let mut is = nodejs_stream("Local");
        is.status.docker_image_repository.clear();
        let resolved = resolve_latest_tagged_image(&is, "12").unwrap();
        assert_eq!(resolved, "registry.example/nodejs@sha256:abc");
    }

    #[test]
    fn test_unknown_tag_is_unresolvable() {
        assert!(resolve_latest_tagged_image(&nodejs_stream("Local"), "14").is_none());
    }

    #[test]
    fn test_status_only_tag_resolves_to_event() {
        let is = stream(json!({
            "metadata": {"name": "app"},
            "status": {"tags": [{"tag": "latest", "items": [
                {"dockerImageReference": "quay.io/org/app@sha256:1", "image": "sha256:1", "generation": 1}
            ]}]}
        }));
        assert_eq!(
            resolve_latest_tagged_image(&is, "latest").unwrap(),
            "quay.io/org/app@sha256:1"
        );
    }

    fn chained_stream() -> ImageStream {
        stream(json!({
            "metadata": {"name": "nodejs", "namespace": "openshift"},
            "spec": {"tags": [
                {"name": "latest", "from": {"kind": "ImageStreamTag", "name": "14"}},
                {"name": "lts", "from": {"kind": "ImageStreamTag", "name": "nodejs:12"}},
                {"name": "12", "from": {"kind": "DockerImage", "name": "registry.example/nodejs:12"}},
                {"name": "14", "from": {"kind": "ImageStreamTag", "name": "lts"}},
                {"name": "loop-a", "from": {"kind": "ImageStreamTag", "name": "loop-b"}},
                {"name": "loop-b", "from": {"kind": "ImageStreamTag", "name": "loop-a"}},
                {"name": "other", "from": {"kind": "ImageStreamTag", "name": "python:3"}},
                {"name": "dangling", "from": {"kind": "ImageStreamTag", "name": "missing"}},
                {"name": "empty"}
            ]}
        }))
    }

    #[test]
    fn test_follow_tag_reference_chain() {
        let is = chained_stream();
        let (final_tag, tag_ref) = follow_tag_reference(&is, "latest").unwrap();
        assert_eq!(final_tag, "12");
        assert_eq!(tag_ref.name, "12");
        assert_eq!(
            source_reference(&is, "latest").unwrap(),
            "registry.example/nodejs:12"
        );
    }

    #[test]
    fn test_follow_tag_reference_errors() {
        let is = chained_stream();
        assert_eq!(
            follow_tag_reference(&is, "loop-a").unwrap_err(),
            TagReferenceError::Circular("loop-a".to_string())
        );
        assert!(matches!(
            follow_tag_reference(&is, "other").unwrap_err(),
            TagReferenceError::CrossImageStream(_)
        ));
        assert_eq!(
            follow_tag_reference(&is, "dangling").unwrap_err(),
            TagReferenceError::NotFound("missing".to_string())
        );
        assert_eq!(
            source_reference(&is, "empty").unwrap_err(),
            TagReferenceError::NoSource("empty".to_string())
        );
    }

    #[test]
    fn test_chained_reference_with_empty_tag_means_latest() {
        let is = stream(json!({
            "metadata": {"name": "nodejs", "namespace": "ns"},
            "spec": {"tags": [
                {"name": "a", "from": {"kind": "ImageStreamTag", "name": "nodejs:"}},
                {"name": "latest", "from": {"kind": "DockerImage", "name": "registry.example/nodejs:16"}},
                {"name": "b", "from": {"kind": "ImageStreamTag", "name": ":12"}}
            ]}
        }));

        let (final_tag, _) = follow_tag_reference(&is, "a").unwrap();
        assert_eq!(final_tag, DEFAULT_IMAGE_TAG);
        assert_eq!(source_reference(&is, "a").unwrap(), "registry.example/nodejs:16");
        assert_eq!(
            follow_tag_reference(&is, "b").unwrap_err(),
            TagReferenceError::Invalid(":12".to_string())
        );
    }

    #[test]
    fn test_latest_generation_reference() {
        let is = nodejs_stream("Source");
        assert_eq!(
            latest_generation_reference(&is, "12").unwrap(),
            "registry.example/nodejs@sha256:abc"
        );
        assert!(latest_generation_reference(&is, "14").is_none());
    }

    #[test]
    fn test_latest_generation_tie_keeps_first() {
        let is = stream(json!({
            "metadata": {"name": "app"},
            "status": {"tags": [{"tag": "v1", "items": [
                {"dockerImageReference": "quay.io/org/app@sha256:first", "generation": 3},
                {"dockerImageReference": "quay.io/org/app@sha256:older", "generation": 1},
                {"dockerImageReference": "quay.io/org/app@sha256:second", "generation": 3}
            ]}]}
        }));
        assert_eq!(
            latest_generation_reference(&is, "v1").unwrap(),
            "quay.io/org/app@sha256:first"
        );
    }
}
