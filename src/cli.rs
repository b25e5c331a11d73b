use std::path::PathBuf;

use clap::Parser;

/// Podscribe - collect logs from every matching container, once per restart
#[derive(Parser, Debug, Default)]
#[command(name = "podscribe")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Pod name patterns; `*` globs are allowed (default: all pods)
    #[arg(value_name = "POD")]
    pub pods: Vec<String>,

    /// Kubernetes context name (default: current context)
    #[arg(long)]
    pub context: Option<String>,

    /// Namespace patterns, repeatable (default: all namespaces)
    #[arg(short, long = "namespace", value_name = "NAMESPACE")]
    pub namespaces: Vec<String>,

    /// Label selector, e.g. `app=web,tier notin (cache)`
    #[arg(short = 'l', long)]
    pub selector: Option<String>,

    /// Container name patterns, repeatable (default: all containers)
    #[arg(short, long = "container", value_name = "CONTAINER")]
    pub containers: Vec<String>,

    /// Only collect from running containers
    #[arg(long)]
    pub running: bool,

    /// Collect the logs of the current pods and exit instead of watching
    #[arg(long)]
    pub oneshot: bool,

    /// Ask the API server to prefix every line with a timestamp
    #[arg(long)]
    pub timestamps: bool,

    /// Number of historical log lines to fetch per container
    #[arg(long, value_name = "LINES")]
    pub tail: Option<i64>,

    /// Only fetch lines newer than this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub since_seconds: Option<i64>,

    /// Write logs into files below this directory instead of stdout
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print one JSON object per log line
    #[arg(long)]
    pub json: bool,

    /// TOML file with defaults for all of the above
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase diagnostic output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
