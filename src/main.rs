mod cli;
mod config;
mod shutdown;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use podscribe_k8s::{KubeClient, KubeLogSource, PodScope, spawn_pod_watch};
use podscribe_logs::{DirectorySink, JsonSink, TextSink};
use podscribe_watch::{LogSink, Watcher};

use crate::cli::Args;
use crate::config::{Output, Settings};

/// Buffered watch events between the API watch and the watcher
const EVENT_BUFFER: usize = 128;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries the collected logs, diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(args.verbose))
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

/// `RUST_LOG` wins; otherwise `-v` raises podscribe's own level
fn env_filter(verbose: u8) -> tracing_subscriber::EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "warn,podscribe={level},podscribe_watch={level},podscribe_k8s={level},podscribe_logs={level}"
        ))
    })
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::load(args)?;
    let options = settings.watch;

    let client = KubeClient::new(settings.context.as_deref()).await?;
    let scope = PodScope::from_namespaces(&options.namespaces);
    let selector = options.label_selector.as_ref().map(ToString::to_string);

    let snapshot = client.list_pods(&scope, selector.as_deref()).await?;
    tracing::info!(
        context = client.context().unwrap_or("<in-cluster>"),
        pods = snapshot.pods.len(),
        "Listed pods"
    );

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown::cancel_on_signal(cancel.clone()));

    // One-shot mode never opens a watch
    let (events, watch_task) = if options.one_shot {
        (None, None)
    } else {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let task = spawn_pod_watch(
            &client,
            scope,
            selector,
            snapshot.resource_version,
            tx,
            cancel.clone(),
        );
        (Some(rx), Some(task))
    };

    let sink: Arc<dyn LogSink> = match settings.output {
        Output::Text => Arc::new(TextSink::stdout()),
        Output::Json => Arc::new(JsonSink::stdout()),
        Output::Directory(dir) => Arc::new(DirectorySink::new(dir)),
    };

    let watcher = Watcher::new(options, Arc::new(KubeLogSource::new(&client)), sink);
    let summary = watcher.watch(snapshot.pods, events, &cancel).await;

    cancel.cancel();
    if let Some(task) = watch_task {
        let _ = task.await;
    }

    tracing::info!(incarnations = summary.incarnations, "{summary}");
    Ok(())
}
