//! Cluster access: watching pods and force deleting them.
//!
//! The [`ClusterClient`] trait is the seam between the watch loop and the
//! Kubernetes API, so tests can drive the supervisor with a scripted fake
//! while production uses [`KubeClusterClient`].

use std::path::Path;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, WatchEvent, WatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::error::Result;
use crate::types::{PodEvent, PodRef};

/// Stream of pod lifecycle events, already mapped out of the wire types.
pub type PodEventStream = BoxStream<'static, PodEvent>;

/// Control-plane operations the recycler needs.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Opens a watch over all pods in all namespaces, with no filter.
    ///
    /// The stream ends when the server closes the connection; transient
    /// stream problems surface as [`PodEvent::Error`] items, not as stream
    /// termination.
    async fn watch_pods(&self) -> Result<PodEventStream>;

    /// Deletes a pod with a zero grace period, bypassing graceful shutdown.
    async fn delete_pod(&self, target: &PodRef) -> Result<()>;
}

/// [`ClusterClient`] backed by a real Kubernetes API connection.
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using ambient identity: the in-cluster service account when
    /// running as a pod, or the local kubeconfig otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable cluster configuration can be inferred.
    pub async fn connect() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self { client })
    }

    /// Connect using an explicit kubeconfig file.
    ///
    /// # Errors
    ///
    /// Returns an error if the kubeconfig cannot be read or the client
    /// cannot be created from it.
    pub async fn from_kubeconfig(path: &Path) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(path)?;
        let config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        let client = Client::try_from(config)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn watch_pods(&self) -> Result<PodEventStream> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let events = pods.watch(&WatchParams::default(), "0").await?;
        Ok(events
            .filter_map(|item| async move { map_watch_item(item) })
            .boxed())
    }

    async fn delete_pod(&self, target: &PodRef) -> Result<()> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &target.namespace);

        // Force delete so the owning controller replaces the pod immediately
        let dp = DeleteParams {
            grace_period_seconds: Some(0),
            ..Default::default()
        };

        pods.delete(&target.name, &dp).await?;

        Ok(())
    }
}

/// Maps one raw watch item into a [`PodEvent`].
///
/// Bookmarks are progress markers rather than lifecycle events and are
/// dropped here. Undecodable payloads become [`PodEvent::Unrecognized`] so
/// the stream keeps flowing past them.
fn map_watch_item(item: kube::Result<WatchEvent<Pod>>) -> Option<PodEvent> {
    match item {
        Ok(WatchEvent::Added(pod)) => Some(PodEvent::Added(pod)),
        Ok(WatchEvent::Modified(pod)) => Some(PodEvent::Modified(pod)),
        Ok(WatchEvent::Deleted(pod)) => Some(PodEvent::Deleted(pod)),
        Ok(WatchEvent::Bookmark(_)) => {
            debug!("Dropping watch bookmark");
            None
        }
        Ok(WatchEvent::Error(status)) => Some(PodEvent::Error(status.to_string())),
        Err(kube::Error::SerdeError(err)) => Some(PodEvent::Unrecognized(err.to_string())),
        Err(err) => Some(PodEvent::Error(err.to_string())),
    }
}
