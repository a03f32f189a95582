use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::{fs::OpenOptions, path::Path, str::FromStr};
use tracing::Level;
use tracing_subscriber::{
    filter::{Directive, EnvFilter, LevelFilter},
    fmt::{self, writer::MakeWriterExt},
    prelude::*,
    Registry,
};

#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Plain,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    File,
}

/// The `[service.log]` section.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case", default)]
pub struct LogConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`. Anything else means `info`.
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Required when `output = "file"`. Lines are appended.
    pub file_path: Option<String>,
    /// Extra per-target directives in `RUST_LOG` syntax, e.g. `"hyper=warn"`.
    pub directives: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            directives: None,
        }
    }
}

impl LogConfig {
    pub fn level(&self) -> Level {
        Level::from_str(self.level.trim()).unwrap_or(Level::INFO)
    }

    fn filter(&self) -> Result<EnvFilter> {
        let default = LevelFilter::from_level(self.level());
        let mut filter = EnvFilter::builder()
            .with_default_directive(default.into())
            .parse("")?;
        if let Some(directives) = self.directives.as_deref() {
            for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                filter = filter.add_directive(
                    directive
                        .parse::<Directive>()
                        .with_context(|| format!("invalid log directive '{}'", directive))?,
                );
            }
        }
        Ok(filter)
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init(config: &LogConfig) -> Result<()> {
    let log_level = config.level();
    let subscriber = Registry::default().with(config.filter()?);

    let installed = match config.output {
        LogOutput::File => {
            let file_path = config
                .file_path
                .as_deref()
                .ok_or_else(|| anyhow!("Log output is 'file' but 'file-path' is not specified"))?;
            if let Some(parent) = Path::new(file_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)
                .with_context(|| format!("failed to open log file {}", file_path))?;
            let file_writer = log_file.with_max_level(log_level);

            match config.format {
                LogFormat::Json => subscriber
                    .with(fmt::layer().with_writer(file_writer).json())
                    .try_init(),
                LogFormat::Plain => subscriber
                    .with(fmt::layer().with_writer(file_writer).with_ansi(false))
                    .try_init(),
            }
        }
        LogOutput::Stdout => {
            let stdout_writer = std::io::stdout.with_max_level(log_level);
            match config.format {
                LogFormat::Json => subscriber
                    .with(fmt::layer().with_writer(stdout_writer).json())
                    .try_init(),
                LogFormat::Plain => subscriber
                    .with(fmt::layer().with_writer(stdout_writer).pretty())
                    .try_init(),
            }
        }
    };
    installed.map_err(|e| anyhow!("failed to install the tracing subscriber: {}", e))
}
