//! The watch loop: open a stream, drain it, reconnect after a delay, forever.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::classify::classify;
use crate::client::{ClusterClient, PodEventStream};
use crate::remediate::Remediator;
use crate::types::{Classification, PodEvent, SkipReason, SupervisorState};

/// How one watch stream came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
    Closed,
    ErrorEvent,
}

/// Keeps an unbroken watch over all pods and feeds each event through
/// classification into remediation.
pub struct WatchSupervisor {
    cluster: Arc<dyn ClusterClient>,
    remediator: Remediator,
    reconnect_delay: Duration,
}

impl WatchSupervisor {
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterClient>, reconnect_delay: Duration) -> Self {
        let remediator = Remediator::new(Arc::clone(&cluster));
        Self {
            cluster,
            remediator,
            reconnect_delay,
        }
    }

    /// Runs the watch loop until the surrounding task is aborted.
    ///
    /// Nothing terminates the loop from the inside: a failed open, a closed
    /// stream, and a server error event all lead to the same delayed
    /// reconnect, with no attempt limit.
    pub async fn run(&self) {
        let mut state = SupervisorState::Disconnected;
        info!(
            state = %state,
            reconnect_delay_seconds = self.reconnect_delay.as_secs(),
            "Watch supervisor starting"
        );

        loop {
            state = SupervisorState::Connecting;
            debug!(state = %state, "Opening pod watch stream");

            match self.cluster.watch_pods().await {
                Ok(events) => {
                    state = SupervisorState::Streaming;
                    info!(state = %state, "Watching pods in all namespaces");

                    let end = self.drain(events).await;
                    state = SupervisorState::Disconnected;
                    match end {
                        StreamEnd::Closed => {
                            warn!(state = %state, "Watch stream closed, reconnecting after delay");
                        }
                        StreamEnd::ErrorEvent => {
                            warn!(
                                state = %state,
                                "Watch stream ended on an error event, reconnecting after delay"
                            );
                        }
                    }
                }
                Err(err) => {
                    state = SupervisorState::Disconnected;
                    warn!(
                        state = %state,
                        error = %err,
                        "Failed to open pod watch stream, retrying after delay"
                    );
                }
            }

            sleep(self.reconnect_delay).await;
        }
    }

    /// Consumes events one at a time until the stream ends.
    ///
    /// Remediation failures are logged and never abort the stream; an error
    /// event from the server abandons the rest of the stream so the loop can
    /// start over from a fresh watch.
    async fn drain(&self, mut events: PodEventStream) -> StreamEnd {
        while let Some(event) = events.next().await {
            match classify(&event) {
                Classification::Remediate(target) => {
                    if let Err(err) = self.remediator.remediate(&target).await {
                        error!(
                            pod = %target,
                            error = %err,
                            "Remediation failed, continuing with next event"
                        );
                    }
                }
                Classification::Skip(SkipReason::StreamError) => {
                    if let PodEvent::Error(message) = &event {
                        warn!(error = %message, "Watch stream reported an error event");
                    }
                    return StreamEnd::ErrorEvent;
                }
                Classification::Skip(SkipReason::UnrecognizedPayload) => {
                    if let PodEvent::Unrecognized(detail) = &event {
                        warn!(detail = %detail, "Skipping unrecognized watch payload");
                    } else {
                        warn!("Skipping pod event without namespace and name");
                    }
                }
                Classification::Skip(reason) => {
                    debug!(reason = ?reason, "Ignoring pod event");
                }
            }
        }

        StreamEnd::Closed
    }
}
