//! Error types with actionable suggestions

use colored::Colorize;
use thiserror::Error;

/// Everything that can go wrong while answering a query
#[derive(Error, Debug)]
pub enum ObuError {
    #[error("could not locate a kubeconfig")]
    KubeconfigNotFound,

    #[error("problem with kubeconfig: {0}")]
    Kubeconfig(String),

    #[error("problem with k8s client: {0}")]
    Client(#[source] kube::Error),

    #[error("problem retrieving {what}: {source}")]
    Fetch {
        what: String,
        #[source]
        source: kube::Error,
    },

    #[error("invalid image stream tag reference (use '<stream>:<tag>'): {0}")]
    InvalidReference(String),

    #[error("image stream tag {reference} had tag reference error: {reason}")]
    TagReference { reference: String, reason: String },

    #[error("unable to resolve image stream tag {0}")]
    Unresolvable(String),

    #[error("Need a namespace to fetch {0}")]
    NoNamespace(&'static str),

    #[error("{0}")]
    MissingData(String),

    #[error("Problem decoding data at key {key} for secret {secret}: {reason}")]
    Decode {
        key: String,
        secret: String,
        reason: String,
    },

    #[error("No image registry docker secrets associated with build service account {0}")]
    NoRegistrySecret(String),

    #[error("a cycle exists in the mirror configuration for source {0}")]
    MirrorCycle(String),

    #[error("problem building registry config: {0}")]
    Render(String),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ObuError>;

impl ObuError {
    /// Hints printed below the error message
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::KubeconfigNotFound => vec![
                "Pass --kubeconfig=PATH or set KUBECONFIG".to_string(),
                "Log in with: oc login <cluster-url>".to_string(),
            ],
            Self::NoNamespace(_) => vec![
                "Pass -n <namespace>".to_string(),
                "Switch projects with: oc project <namespace>".to_string(),
            ],
            Self::InvalidReference(_) => {
                vec!["Example: obu translate nodejs:12 -n openshift".to_string()]
            }
            Self::Fetch { source, .. } => fetch_suggestions(source),
            _ => Vec::new(),
        }
    }

    /// Print the error and its suggestions to stderr
    pub fn display(&self) {
        crate::log_debug!("{:?}", self);
        eprintln!("ERROR: {}", self);

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            eprintln!("{}", "Suggestions:".yellow().bold());
            for suggestion in &suggestions {
                eprintln!("  {} {}", "->".blue(), suggestion);
            }
        }
    }
}

fn fetch_suggestions(err: &kube::Error) -> Vec<String> {
    let text = err.to_string();

    if text.contains("Forbidden") || text.contains("forbidden") {
        return vec!["Verify your user can read this resource: oc auth can-i get <resource>".to_string()];
    }

    if text.contains("Unauthorized") || text.contains("unauthorized") {
        return vec!["Your token may have expired, log in again with: oc login".to_string()];
    }

    if text.contains("connection refused") || text.contains("timed out") {
        return vec!["Check that the cluster API server is reachable".to_string()];
    }

    Vec::new()
}
