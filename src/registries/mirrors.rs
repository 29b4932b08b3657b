//! Merging image content source policies into one mirror list per source

use crate::k8s::openshift::{ImageContentSourcePolicy, RepositoryDigestMirrors};
use crate::utils::errors::{ObuError, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Directed graph sorted with lexicographic tie-breaking
#[derive(Debug, Default)]
struct TopoGraph {
    vertices: BTreeMap<String, Vertex>,
}

#[derive(Debug, Default)]
struct Vertex {
    outgoing: BTreeSet<String>,
    incoming: usize,
}

impl TopoGraph {
    fn add_edge(&mut self, from: &str, to: &str) {
        self.vertices.entry(to.to_string()).or_default();
        let added = self
            .vertices
            .entry(from.to_string())
            .or_default()
            .outgoing
            .insert(to.to_string());
        if added && let Some(dest) = self.vertices.get_mut(to) {
            dest.incoming += 1;
        }
    }

    /// Kahn's algorithm; `None` if the graph has a cycle
    fn sorted(mut self) -> Option<Vec<String>> {
        let mut ready: BTreeSet<String> = self
            .vertices
            .iter()
            .filter(|(_, v)| v.incoming == 0)
            .map(|(k, _)| k.clone())
            .collect();

        let mut result = Vec::with_capacity(self.vertices.len());
        while let Some(next) = ready.pop_first() {
            let outgoing = self
                .vertices
                .get(&next)
                .map(|v| v.outgoing.clone())
                .unwrap_or_default();
            for dest in outgoing {
                if let Some(vertex) = self.vertices.get_mut(&dest) {
                    vertex.incoming -= 1;
                    if vertex.incoming == 0 {
                        ready.insert(dest);
                    }
                }
            }
            result.push(next);
        }

        (result.len() == self.vertices.len()).then_some(result)
    }
}

/// True if the set lists at least one mirror other than its own source
fn contains_real_mirror(set: &RepositoryDigestMirrors) -> bool {
    set.mirrors.iter().any(|m| *m != set.source)
}

/// Combine all policies into one ordered mirror list per source.
///
/// Sets for the same source are merged so the relative order of every input
/// set is kept where possible: `(B, C)` and `(A, B)` become `(A, B, C)`.
/// Sources come out sorted.
pub fn merged_mirror_sets(
    policies: &[ImageContentSourcePolicy],
) -> Result<Vec<RepositoryDigestMirrors>> {
    let mut by_source: BTreeMap<&str, Vec<&RepositoryDigestMirrors>> = BTreeMap::new();
    for policy in policies {
        for set in &policy.spec.repository_digest_mirrors {
            if !contains_real_mirror(set) {
                continue;
            }
            by_source.entry(set.source.as_str()).or_default().push(set);
        }
    }

    let mut merged = Vec::with_capacity(by_source.len());
    for (source, sets) in by_source {
        let mut graph = TopoGraph::default();
        for set in sets {
            for pair in set.mirrors.windows(2) {
                graph.add_edge(&pair[0], &pair[1]);
            }
            if !set.mirrors.iter().any(|m| m == source)
                && let Some(last) = set.mirrors.last()
            {
                graph.add_edge(last, source);
            }
        }

        let mut mirrors = graph
            .sorted()
            .ok_or_else(|| ObuError::MirrorCycle(source.to_string()))?;
        if mirrors.last().is_some_and(|m| m == source) {
            mirrors.pop();
        }

        merged.push(RepositoryDigestMirrors {
            source: source.to_string(),
            mirrors,
        });
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::openshift::ImageContentSourcePolicySpec;

    fn policy(sets: &[(&str, &[&str])]) -> ImageContentSourcePolicy {
        ImageContentSourcePolicy {
            spec: ImageContentSourcePolicySpec {
                repository_digest_mirrors: sets
                    .iter()
                    .map(|(source, mirrors)| RepositoryDigestMirrors {
                        source: source.to_string(),
                        mirrors: mirrors.iter().map(|m| m.to_string()).collect(),
                    })
                    .collect(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_keeps_relative_order() {
        let policies = vec![
            policy(&[("registry.source/ns", &["mirror.b/ns", "mirror.c/ns"])]),
            policy(&[("registry.source/ns", &["mirror.a/ns", "mirror.b/ns"])]),
        ];
        let merged = merged_mirror_sets(&policies).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].mirrors, vec!["mirror.a/ns", "mirror.b/ns", "mirror.c/ns"]);
    }

    #[test]
    fn test_merge_sorts_sources_and_skips_self_mirrors() {
        let policies = vec![policy(&[
            ("z.source/app", &["mirror.example/app"]),
            ("a.source/app", &["mirror.example/app2"]),
            ("self.source/app", &["self.source/app"]),
        ])];
        let merged = merged_mirror_sets(&policies).unwrap();
        let sources: Vec<&str> = merged.iter().map(|m| m.source.as_str()).collect();
        assert_eq!(sources, vec!["a.source/app", "z.source/app"]);
    }

    #[test]
    fn test_source_listed_among_mirrors_is_kept_in_place() {
        let policies = vec![policy(&[(
            "registry.source/ns",
            &["mirror.a/ns", "registry.source/ns", "mirror.z/ns"],
        )])];
        let merged = merged_mirror_sets(&policies).unwrap();
        assert_eq!(
            merged[0].mirrors,
            vec!["mirror.a/ns", "registry.source/ns", "mirror.z/ns"]
        );
    }

    #[test]
    fn test_conflicting_order_is_a_cycle() {
        let policies = vec![
            policy(&[("registry.source/ns", &["mirror.a/ns", "mirror.b/ns"])]),
            policy(&[("registry.source/ns", &["mirror.b/ns", "mirror.a/ns"])]),
        ];
        assert!(matches!(
            merged_mirror_sets(&policies),
            Err(ObuError::MirrorCycle(s)) if s == "registry.source/ns"
        ));
    }

    #[test]
    fn test_no_policies() {
        assert!(merged_mirror_sets(&[]).unwrap().is_empty());
    }
}
