//! Subscriber setup for the collector.
//!
//! Console output goes to stderr so stdout stays free for
//! `--dump-default-config`. File output is optional and rolled by
//! `tracing-appender`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log directive `{directive}`: {source}")]
    Directive {
        directive: String,
        #[source]
        source: ParseError,
    },

    #[error("failed to create log file appender: {0}")]
    Appender(#[from] rolling::InitError),
}

/// How often the log file is rolled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Hourly,
    Daily,
    Never,
}

impl From<Rotation> for rolling::Rotation {
    fn from(r: Rotation) -> Self {
        match r {
            Rotation::Hourly => rolling::Rotation::HOURLY,
            Rotation::Daily => rolling::Rotation::DAILY,
            Rotation::Never => rolling::Rotation::NEVER,
        }
    }
}

/// The `[log]` table of the collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default level (trace, debug, info, warn, error). `RUST_LOG` wins
    /// when set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Extra per-target directives such as `dsc_stats=debug`.
    #[serde(default)]
    pub directives: Vec<String>,

    /// Directory for log files. No file output when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default = "default_prefix")]
    pub file_prefix: String,

    #[serde(default)]
    pub rotation: Rotation,

    #[serde(default)]
    pub json_format: bool,

    /// Also log to stderr.
    #[serde(default = "default_true")]
    pub console_output: bool,
}

fn default_level() -> String {
    "info".into()
}

fn default_prefix() -> String {
    "dsc".into()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_level(),
            directives: Vec::new(),
            log_dir: None,
            file_prefix: default_prefix(),
            rotation: Rotation::default(),
            json_format: false,
            console_output: true,
        }
    }
}

/// Build the level filter: `RUST_LOG` or `level`, then `directives`.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    for directive in &config.directives {
        let parsed: Directive = directive.parse().map_err(|source| LogError::Directive {
            directive: directive.clone(),
            source,
        })?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

type BoxedLayer<S> = Box<dyn tracing_subscriber::Layer<S> + Send + Sync>;

/// Install the global subscriber. Call once at startup.
///
/// Hold the returned guard until exit; dropping it flushes the file writer.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LogError> {
    let filter = build_filter(config)?;

    let console: Option<BoxedLayer<_>> = match (config.console_output, config.json_format) {
        (false, _) => None,
        (true, true) => Some(Box::new(fmt::layer().json().with_writer(std::io::stderr))),
        (true, false) => Some(Box::new(fmt::layer().with_writer(std::io::stderr))),
    };

    let mut guard = None;
    let file: Option<BoxedLayer<_>> = match &config.log_dir {
        Some(dir) => {
            let appender = rolling::RollingFileAppender::builder()
                .rotation(config.rotation.into())
                .filename_prefix(&config.file_prefix)
                .filename_suffix("log")
                .build(dir)?;
            let (writer, g) = tracing_appender::non_blocking(appender);
            guard = Some(g);
            if config.json_format {
                Some(Box::new(fmt::layer().json().with_writer(writer)))
            } else {
                Some(Box::new(fmt::layer().with_ansi(false).with_writer(writer)))
            }
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(guard)
}
