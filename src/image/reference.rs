//! Image stream tag and docker pull spec parsing

use crate::utils::errors::{ObuError, Result};
use std::fmt;

/// Tag used when a reference names a stream but leaves the tag empty
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Split `<stream>:<tag>` at the last colon.
///
/// An empty tag (`nodejs:`) resolves to [`DEFAULT_IMAGE_TAG`].
pub fn split_stream_tag(reference: &str) -> Result<(&str, &str)> {
    let (stream, tag) = reference
        .rsplit_once(':')
        .ok_or_else(|| ObuError::InvalidReference(reference.to_string()))?;

    if stream.is_empty() {
        return Err(ObuError::InvalidReference(reference.to_string()));
    }

    let tag = if tag.is_empty() { DEFAULT_IMAGE_TAG } else { tag };
    Ok((stream, tag))
}

/// A parsed `[registry/][namespace/]name[:tag][@id]` pull spec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockerImageReference {
    pub registry: String,
    pub namespace: String,
    pub name: String,
    pub tag: String,
    pub id: String,
}

impl DockerImageReference {
    /// Parse a pull spec, returning `None` when it is not well formed
    pub fn parse(spec: &str) -> Option<Self> {
        if spec.is_empty() || spec.chars().any(char::is_whitespace) {
            return None;
        }

        let (repository, id) = match spec.split_once('@') {
            Some((repository, id)) if !id.is_empty() => (repository, id),
            Some(_) => return None,
            None => (spec, ""),
        };

        // A colon after the last slash separates the tag; earlier colons are ports
        let last_slash = repository.rfind('/').map_or(0, |i| i + 1);
        let (path, tag) = match repository[last_slash..].rfind(':') {
            Some(i) => {
                let at = last_slash + i;
                (&repository[..at], &repository[at + 1..])
            }
            None => (repository, ""),
        };

        let parts: Vec<&str> = path.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }

        let mut reference = Self {
            tag: tag.to_string(),
            id: id.to_string(),
            ..Self::default()
        };

        match parts.as_slice() {
            [name] => reference.name = name.to_string(),
            [first, name] if looks_like_registry(first) => {
                reference.registry = first.to_string();
                reference.name = name.to_string();
            }
            [namespace, name] => {
                reference.namespace = namespace.to_string();
                reference.name = name.to_string();
            }
            [registry, namespace, rest @ ..] => {
                reference.registry = registry.to_string();
                reference.namespace = namespace.to_string();
                reference.name = rest.join("/");
            }
            [] => return None,
        }

        Some(reference)
    }

    /// Drop any tag and pin the reference to `id`
    pub fn with_digest(mut self, id: &str) -> Self {
        self.tag.clear();
        self.id = id.to_string();
        self
    }
}

impl fmt::Display for DockerImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: Vec<&str> = [&self.registry, &self.namespace, &self.name]
            .into_iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        write!(f, "{}", path.join("/"))?;

        if !self.id.is_empty() {
            write!(f, "@{}", self.id)
        } else if !self.tag.is_empty() {
            write!(f, ":{}", self.tag)
        } else {
            Ok(())
        }
    }
}

fn looks_like_registry(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}
