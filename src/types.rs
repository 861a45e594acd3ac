//! Core types: pod identity, watch events, and classification outcomes.

use std::fmt;

use k8s_openapi::api::core::v1::Pod;

/// Identity of a pod, the only piece of state a remediation needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
}

impl PodRef {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Extracts the identity from a pod snapshot, if the snapshot carries one.
    #[must_use]
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let namespace = pod.metadata.namespace.clone()?;
        let name = pod.metadata.name.clone()?;
        Some(Self { namespace, name })
    }
}

impl fmt::Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// One notification from the pod watch stream, mapped out of the transport
/// layer so consumers never see raw wire types.
#[derive(Debug, Clone)]
pub enum PodEvent {
    Added(Pod),
    Modified(Pod),
    Deleted(Pod),
    /// The server reported an error on the stream itself.
    Error(String),
    /// The payload could not be decoded into a pod snapshot.
    Unrecognized(String),
}

/// Outcome of classifying a single watch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The pod is stuck in the crash-restart penalty state and should be
    /// force deleted so its owner recreates it immediately.
    Remediate(PodRef),
    Skip(SkipReason),
}

/// Why an event produced no remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Only modifications can reveal a newly crash-looping pod.
    NotModified,
    /// The stream reported an error instead of a pod change.
    StreamError,
    /// The payload did not decode into a usable pod snapshot.
    UnrecognizedPayload,
    /// The pod already carries a deletion timestamp.
    AlreadyDeleting,
    /// No container is waiting in the crash-restart penalty state.
    NotCrashLooping,
}

/// Connection state of the watch supervisor, tracked for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Disconnected,
    Connecting,
    Streaming,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SupervisorState::Disconnected => "disconnected",
            SupervisorState::Connecting => "connecting",
            SupervisorState::Streaming => "streaming",
        };
        f.write_str(label)
    }
}
