//! Container discovery and log collection orchestration for podscribe
//!
//! Pods are admitted by name, namespace and label filters; every running or
//! terminated container incarnation (container plus restart count) gets
//! exactly one collection task streaming its logs into a sink.

mod collect;
mod criteria;
mod dispatch;
mod options;
mod pattern;
mod selector;
mod source;
mod tracker;
mod watcher;

#[cfg(test)]
mod test_support;

pub use collect::{CollectionOutcome, CollectionReport, CollectionTask};
pub use criteria::{Criteria, Rejection};
pub use dispatch::Dispatcher;
pub use options::{LogOptions, WatchOptions};
pub use pattern::{PatternList, matches_any, name_matches};
pub use selector::{LabelSelector, Requirement, SelectorError};
pub use source::{LogRequest, LogSink, LogSource, LogStream, LogTarget};
pub use tracker::IncarnationTracker;
pub use watcher::{WatchState, WatchSummary, Watcher};

// Re-export types used in our public API
pub use podscribe_types::{IncarnationId, PodEvent, PodEventKind, PodInfo};
