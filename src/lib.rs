//! Pod recycler core library
//!
//! Watches pods cluster-wide and force deletes any pod stuck in
//! `CrashLoopBackOff`, so its owning controller recreates it immediately
//! instead of waiting out the platform's restart backoff.

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod remediate;
pub mod supervisor;
pub mod types;

// Re-export commonly used types
pub use client::{ClusterClient, KubeClusterClient, PodEventStream};
pub use config::RecyclerConfig;
pub use error::{Error, Result};
pub use remediate::Remediator;
pub use supervisor::WatchSupervisor;
pub use types::{Classification, PodEvent, PodRef, SkipReason, SupervisorState};
