//! Executes the remediation action for an eligible pod.

use std::sync::Arc;

use tracing::{debug, info};

use crate::client::ClusterClient;
use crate::error::{Error, Result};
use crate::types::PodRef;

/// Issues the forced delete for pods the classifier marked eligible.
///
/// A failed delete is wrapped with the pod's identity and returned; it is
/// never retried here. The pod's owner keeps reporting the crash state, so
/// the next `Modified` event retries naturally.
pub struct Remediator {
    cluster: Arc<dyn ClusterClient>,
}

impl Remediator {
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self { cluster }
    }

    /// Force deletes one pod so its owning controller recreates it
    /// immediately instead of waiting out the restart backoff.
    ///
    /// All failures are reported uniformly; a pod already gone returns the
    /// same wrapped error as any other API failure.
    pub async fn remediate(&self, target: &PodRef) -> Result<()> {
        debug!(pod = %target, "Force deleting crash-looping pod");

        self.cluster
            .delete_pod(target)
            .await
            .map_err(|source| Error::DeleteFailed {
                pod: target.clone(),
                source: Box::new(source),
            })?;

        info!(pod = %target, "Force deleted crash-looping pod");
        Ok(())
    }
}
