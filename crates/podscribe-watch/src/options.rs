use crate::pattern::PatternList;
use crate::selector::LabelSelector;

/// Filters and behaviour of a watch, fixed at startup
#[derive(Clone, Debug, Default)]
pub struct WatchOptions {
    /// Label selector (None = all pods)
    pub label_selector: Option<LabelSelector>,

    /// Namespace patterns (empty = all)
    pub namespaces: PatternList,

    /// Pod name patterns (empty = all)
    pub resource_names: PatternList,

    /// Container name patterns (empty = all)
    pub container_names: PatternList,

    /// Only collect from running containers, skipping terminated ones
    pub running_only: bool,

    /// Process the initial snapshot only and do not follow streams
    pub one_shot: bool,

    /// Extra parameters for every log request
    pub logs: LogOptions,
}

/// Log request parameters shared by all collection tasks
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Ask the API server to prefix lines with RFC 3339 timestamps
    pub timestamps: bool,

    /// Only fetch this many historical lines
    pub tail_lines: Option<i64>,

    /// Only fetch lines newer than this many seconds
    pub since_seconds: Option<i64>,
}
