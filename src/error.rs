//! Error types shared across the recycler.

use thiserror::Error;

use crate::types::PodRef;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by cluster operations and remediation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("Failed to delete pod {pod}: {source}")]
    DeleteFailed {
        pod: PodRef,
        #[source]
        source: Box<Error>,
    },
}
