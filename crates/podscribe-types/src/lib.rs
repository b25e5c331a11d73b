//! Shared types for podscribe
//!
//! This crate contains the pod observations, incarnation identities and watch
//! events passed between the podscribe crates.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::core::v1::{ContainerStatus, Pod};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Pod Observations
// ============================================================================

/// An immutable snapshot of a pod as seen by the watcher
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,

    /// Init container names, in spec order
    pub init_containers: Vec<String>,

    /// Regular container names, in spec order
    pub containers: Vec<String>,

    pub init_container_statuses: Vec<ContainerStatusInfo>,
    pub container_statuses: Vec<ContainerStatusInfo>,
}

impl PodInfo {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Add a regular container together with its reported status
    pub fn with_container(mut self, status: ContainerStatusInfo) -> Self {
        self.containers.push(status.name.clone());
        self.container_statuses.push(status);
        self
    }

    /// Add an init container together with its reported status
    pub fn with_init_container(mut self, status: ContainerStatusInfo) -> Self {
        self.init_containers.push(status.name.clone());
        self.init_container_statuses.push(status);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Status of an init container by name
    pub fn init_container_status(&self, container: &str) -> Option<&ContainerStatusInfo> {
        self.init_container_statuses
            .iter()
            .find(|s| s.name == container)
    }

    /// Status of a regular container by name
    pub fn container_status(&self, container: &str) -> Option<&ContainerStatusInfo> {
        self.container_statuses.iter().find(|s| s.name == container)
    }
}

/// Lifecycle state of a container
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Waiting,
    Running,
    Terminated,
}

impl ContainerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Running => "running",
            Self::Terminated => "terminated",
        }
    }
}

/// Reported status of one container
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerStatusInfo {
    pub name: String,

    /// `None` when the kubelet has not reported any state yet
    pub state: Option<ContainerState>,

    pub restart_count: i32,
}

impl ContainerStatusInfo {
    pub fn new(name: impl Into<String>, state: ContainerState, restart_count: i32) -> Self {
        Self {
            name: name.into(),
            state: Some(state),
            restart_count,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == Some(ContainerState::Running)
    }

    pub fn is_terminated(&self) -> bool {
        self.state == Some(ContainerState::Terminated)
    }
}

impl From<&ContainerStatus> for ContainerStatusInfo {
    fn from(status: &ContainerStatus) -> Self {
        // A container that reports both running and terminated is treated as
        // running, the same precedence kubectl uses.
        let state = status.state.as_ref().and_then(|s| {
            if s.running.is_some() {
                Some(ContainerState::Running)
            } else if s.terminated.is_some() {
                Some(ContainerState::Terminated)
            } else if s.waiting.is_some() {
                Some(ContainerState::Waiting)
            } else {
                None
            }
        });

        Self {
            name: status.name.clone(),
            state,
            restart_count: status.restart_count,
        }
    }
}

impl TryFrom<&Pod> for PodInfo {
    type Error = DecodeError;

    fn try_from(pod: &Pod) -> Result<Self, Self::Error> {
        let name = pod
            .metadata
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or(DecodeError::MissingName)?;
        let namespace = pod
            .metadata
            .namespace
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DecodeError::MissingNamespace(name.clone()))?;

        let mut info = PodInfo::new(name, namespace);
        info.labels = pod.metadata.labels.clone().unwrap_or_default();

        if let Some(spec) = &pod.spec {
            info.containers = spec.containers.iter().map(|c| c.name.clone()).collect();
            info.init_containers = spec
                .init_containers
                .iter()
                .flatten()
                .map(|c| c.name.clone())
                .collect();
        }

        if let Some(status) = &pod.status {
            info.container_statuses = status
                .container_statuses
                .iter()
                .flatten()
                .map(ContainerStatusInfo::from)
                .collect();
            info.init_container_statuses = status
                .init_container_statuses
                .iter()
                .flatten()
                .map(ContainerStatusInfo::from)
                .collect();
        }

        Ok(info)
    }
}

// ============================================================================
// Incarnations
// ============================================================================

/// One run of one container; a restart yields a new incarnation
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IncarnationId {
    pub namespace: String,
    pub pod: String,
    pub container: String,
    pub restart_count: i32,
}

impl IncarnationId {
    pub fn new(pod: &PodInfo, container: &str, restart_count: i32) -> Self {
        Self {
            namespace: pod.namespace.clone(),
            pod: pod.name.clone(),
            container: container.to_string(),
            restart_count,
        }
    }
}

impl fmt::Display for IncarnationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.namespace, self.pod, self.container, self.restart_count
        )
    }
}

// ============================================================================
// Watch Events
// ============================================================================

/// Kind of a pod watch event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PodEventKind {
    Added,
    Modified,
    Deleted,
    Bookmark,
    Error,
}

/// A raw watch event; the payload is decoded lazily by the watcher
#[derive(Clone, Debug)]
pub struct PodEvent {
    pub kind: PodEventKind,
    pub object: serde_json::Value,
}

impl PodEvent {
    pub fn new(kind: PodEventKind, object: serde_json::Value) -> Self {
        Self { kind, object }
    }

    /// Decode the payload into a pod observation
    pub fn decode(&self) -> Result<PodInfo, DecodeError> {
        match self.kind {
            PodEventKind::Added | PodEventKind::Modified | PodEventKind::Deleted => {}
            kind => return Err(DecodeError::NotAPod(kind)),
        }

        if let Some(kind) = self.object.get("kind").and_then(|k| k.as_str()) {
            if kind != "Pod" {
                return Err(DecodeError::UnexpectedKind(kind.to_string()));
            }
        }

        let pod = Pod::deserialize(&self.object)?;
        PodInfo::try_from(&pod)
    }
}

/// Reasons a watch payload cannot become a [`PodInfo`]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{0:?} events do not carry a pod")]
    NotAPod(PodEventKind),

    #[error("unexpected object kind {0:?}")]
    UnexpectedKind(String),

    #[error("malformed pod object: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("pod has no name")]
    MissingName,

    #[error("pod {0} has no namespace")]
    MissingNamespace(String),
}
