use std::fmt;
use std::sync::Arc;

use podscribe_types::PodInfo;

use crate::options::WatchOptions;

/// A pod-level filter that rejected a pod
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    Name,
    Namespace,
    Labels,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "Pod name does not match.",
            Self::Namespace => "Pod namespace does not match.",
            Self::Labels => "Pod labels do not match.",
        })
    }
}

/// Decides which pods are considered for log collection
#[derive(Clone, Debug)]
pub struct Criteria {
    options: Arc<WatchOptions>,
}

impl Criteria {
    pub fn new(options: Arc<WatchOptions>) -> Self {
        Self { options }
    }

    /// Admit a pod if its name, namespace and labels all match.
    ///
    /// Every failing filter is logged, not just the first one.
    pub fn admit(&self, pod: &PodInfo) -> bool {
        let rejections = self.rejections(pod);
        for rejection in &rejections {
            tracing::debug!(
                namespace = %pod.namespace,
                pod = %pod.name,
                "{rejection}"
            );
        }
        rejections.is_empty()
    }

    /// All filters the pod fails, in evaluation order
    pub fn rejections(&self, pod: &PodInfo) -> Vec<Rejection> {
        let mut rejections = Vec::new();

        if !self.options.resource_names.matches(&pod.name) {
            rejections.push(Rejection::Name);
        }
        if !self.options.namespaces.matches(&pod.namespace) {
            rejections.push(Rejection::Namespace);
        }
        if !self.labels_match(pod) {
            rejections.push(Rejection::Labels);
        }

        rejections
    }

    fn labels_match(&self, pod: &PodInfo) -> bool {
        self.options
            .label_selector
            .as_ref()
            .is_none_or(|selector| selector.matches(&pod.labels))
    }
}
