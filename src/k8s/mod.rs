//! Kubernetes and OpenShift API access

pub mod client;
pub mod openshift;
pub mod resources;

pub use client::{ClusterAccess, ConfigSource};
pub use resources::{Cluster, ClusterApi, LazyCluster};
