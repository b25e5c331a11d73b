use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use podscribe_watch::{LabelSelector, LogOptions, PatternList, SelectorError, WatchOptions};

use crate::cli::Args;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid label selector")]
    Selector(#[from] SelectorError),

    #[error("--json cannot be combined with --output-dir")]
    ConflictingOutputs,
}

/// Defaults read from `--config`; every key is optional
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub context: Option<String>,
    pub pods: Vec<String>,
    pub namespaces: Vec<String>,
    pub selector: Option<String>,
    pub containers: Vec<String>,
    pub running: bool,
    pub oneshot: bool,
    pub timestamps: bool,
    pub tail: Option<i64>,
    pub since_seconds: Option<i64>,
    pub output_dir: Option<PathBuf>,
    pub json: bool,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Where collected logs go
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
    Directory(PathBuf),
}

/// Effective settings after merging the config file and the command line
#[derive(Debug)]
pub struct Settings {
    pub context: Option<String>,
    pub output: Output,
    pub watch: WatchOptions,
}

impl Settings {
    /// Read `--config` (if any) and let command line flags override it
    pub fn load(args: Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    /// Lists given on the command line replace the file's lists, scalar
    /// flags override, switches are OR-ed.
    pub fn merge(args: Args, file: FileConfig) -> Result<Self, ConfigError> {
        let pick = |cli: Vec<String>, file: Vec<String>| if cli.is_empty() { file } else { cli };

        let json = args.json || file.json;
        let output_dir = args.output_dir.or(file.output_dir);
        let output = match (output_dir, json) {
            (Some(_), true) => return Err(ConfigError::ConflictingOutputs),
            (Some(dir), false) => Output::Directory(dir),
            (None, true) => Output::Json,
            (None, false) => Output::Text,
        };

        let label_selector = args
            .selector
            .or(file.selector)
            .map(|s| LabelSelector::parse(&s))
            .transpose()?
            .filter(|s| !s.is_empty());

        let watch = WatchOptions {
            label_selector,
            namespaces: PatternList::new(pick(args.namespaces, file.namespaces)),
            resource_names: PatternList::new(pick(args.pods, file.pods)),
            container_names: PatternList::new(pick(args.containers, file.containers)),
            running_only: args.running || file.running,
            one_shot: args.oneshot || file.oneshot,
            logs: LogOptions {
                timestamps: args.timestamps || file.timestamps,
                tail_lines: args.tail.or(file.tail),
                since_seconds: args.since_seconds.or(file.since_seconds),
            },
        };

        Ok(Self {
            context: args.context.or(file.context),
            output,
            watch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("podscribe").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_only() {
        let settings = Settings::merge(
            args(&["web-*", "-n", "shop", "-c", "app", "-l", "app=web", "--oneshot"]),
            FileConfig::default(),
        )
        .unwrap();

        assert_eq!(settings.output, Output::Text);
        assert_eq!(settings.watch.resource_names.as_slice(), ["web-*"]);
        assert_eq!(settings.watch.namespaces.as_slice(), ["shop"]);
        assert_eq!(settings.watch.container_names.as_slice(), ["app"]);
        assert!(settings.watch.one_shot);
        assert!(!settings.watch.running_only);
        assert_eq!(
            settings.watch.label_selector.unwrap().to_string(),
            "app=web"
        );
    }

    #[test]
    fn test_file_defaults_and_cli_overrides() {
        let file = FileConfig::parse(
            r#"
            context = "staging"
            namespaces = ["shop", "billing-*"]
            containers = ["app"]
            selector = "tier=frontend"
            running = true
            tail = 50
            output-dir = "/var/log/pods"
            "#,
        )
        .unwrap();

        let settings = Settings::merge(args(&["-c", "proxy", "--tail", "10"]), file).unwrap();

        assert_eq!(settings.context.as_deref(), Some("staging"));
        assert_eq!(settings.watch.namespaces.as_slice(), ["shop", "billing-*"]);
        assert_eq!(settings.watch.container_names.as_slice(), ["proxy"]);
        assert!(settings.watch.running_only);
        assert_eq!(settings.watch.logs.tail_lines, Some(10));
        assert_eq!(
            settings.output,
            Output::Directory(PathBuf::from("/var/log/pods"))
        );
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            Settings::merge(args(&["-l", "app in ("]), FileConfig::default()),
            Err(ConfigError::Selector(_))
        ));
        assert!(matches!(
            Settings::merge(args(&["--json", "-o", "logs"]), FileConfig::default()),
            Err(ConfigError::ConflictingOutputs)
        ));
        assert!(FileConfig::parse("unknown = 1").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("podscribe.toml");
        std::fs::write(&path, "json = true\npods = [\"api-*\"]\n").unwrap();

        let settings = Settings::load(Args {
            config: Some(path),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(settings.output, Output::Json);
        assert_eq!(settings.watch.resource_names.as_slice(), ["api-*"]);

        assert!(matches!(
            Settings::load(Args {
                config: Some(dir.path().join("missing.toml")),
                ..Default::default()
            }),
            Err(ConfigError::Read { .. })
        ));
    }
}
