//! Kubernetes client for podscribe
//!
//! This crate provides the cluster side of podscribe: the initial pod
//! listing, the live pod watch feed, and container log streams.

mod client;
mod logs;
mod watch;

pub use client::{KubeClient, PodScope, PodSnapshot};
pub use logs::KubeLogSource;
pub use watch::spawn_pod_watch;

// Re-export types that are used in our public API
pub use podscribe_types::{PodEvent, PodInfo};
