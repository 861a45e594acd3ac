//! Decides whether a single watch event warrants remediation.
//!
//! Classification is pure: no I/O and no logging, so every rule here is
//! checkable with plain unit tests. The supervisor owns acting on (and
//! logging) the outcome.

use k8s_openapi::api::core::v1::Pod;

use crate::types::{Classification, PodEvent, PodRef, SkipReason};

/// Waiting reason the platform assigns to a container stuck in the
/// crash-restart penalty state.
pub const CRASH_LOOP_REASON: &str = "CrashLoopBackOff";

/// Classifies one watch event.
///
/// Only `Modified` events are remediation candidates: a pod entering the
/// crash-restart penalty state always surfaces as a modification, while
/// `Added` events replay existing state on every reconnect and `Deleted`
/// pods are already gone. A pod that carries a deletion timestamp is being
/// torn down and must never be targeted again.
#[must_use]
pub fn classify(event: &PodEvent) -> Classification {
    let pod = match event {
        PodEvent::Modified(pod) => pod,
        PodEvent::Added(_) | PodEvent::Deleted(_) => {
            return Classification::Skip(SkipReason::NotModified)
        }
        PodEvent::Error(_) => return Classification::Skip(SkipReason::StreamError),
        PodEvent::Unrecognized(_) => {
            return Classification::Skip(SkipReason::UnrecognizedPayload)
        }
    };

    if pod.metadata.deletion_timestamp.is_some() {
        return Classification::Skip(SkipReason::AlreadyDeleting);
    }

    if !is_crash_looping(pod) {
        return Classification::Skip(SkipReason::NotCrashLooping);
    }

    match PodRef::from_pod(pod) {
        Some(target) => Classification::Remediate(target),
        // A snapshot without namespace and name cannot be acted on.
        None => Classification::Skip(SkipReason::UnrecognizedPayload),
    }
}

/// True when any container in the pod is waiting with the crash-restart
/// penalty reason. Init containers are not consulted: a crash-looping init
/// container keeps the pod Pending, which is a different failure mode.
fn is_crash_looping(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref())
        .is_some_and(|statuses| {
            statuses.iter().any(|cs| {
                cs.state
                    .as_ref()
                    .and_then(|state| state.waiting.as_ref())
                    .and_then(|waiting| waiting.reason.as_deref())
                    == Some(CRASH_LOOP_REASON)
            })
        })
}
