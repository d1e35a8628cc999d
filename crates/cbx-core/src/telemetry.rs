//! Tracing setup for the release tool binaries.
//!
//! Logging is configured from an explicit [`LogConfig`]. [`build_subscriber`]
//! returns the subscriber without installing it (tests wrap it in
//! `tracing::subscriber::with_default`); [`init_tracing`] installs it as the
//! global default once per process.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{Level, Metadata};
use tracing_subscriber::filter::{filter_fn, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::error::{CoreError, Result};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleStyle {
    /// Standard `fmt` output, filtered by `RUST_LOG` when set.
    #[default]
    Full,
    /// Bare messages so logged commands can be copy-pasted; errors keep a
    /// level prefix.
    Plain,
    /// Newline-delimited JSON.
    Json,
}

/// Logging sinks for one process.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Console verbosity.
    pub level: Level,
    pub console: ConsoleStyle,
    /// Optional log file, truncated on open, always written at DEBUG.
    pub log_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            console: ConsoleStyle::Full,
            log_file: None,
        }
    }
}

impl LogConfig {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn console(mut self, style: ConsoleStyle) -> Self {
        self.console = style;
        self
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}

fn console_layers(config: &LogConfig) -> Vec<BoxedLayer> {
    let level = config.level;
    match config.console {
        ConsoleStyle::Full => {
            let env_filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level.as_str()));
            vec![fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(env_filter)
                .boxed()]
        }
        ConsoleStyle::Json => {
            let env_filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level.as_str()));
            vec![fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .json()
                .with_filter(env_filter)
                .boxed()]
        }
        ConsoleStyle::Plain => {
            let messages = fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_level(false)
                .with_target(false)
                .with_filter(filter_fn(move |meta: &Metadata<'_>| {
                    *meta.level() != Level::ERROR && *meta.level() <= level
                }))
                .boxed();
            let errors = fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_target(false)
                .with_filter(LevelFilter::ERROR)
                .boxed();
            vec![messages, errors]
        }
    }
}

/// Build the subscriber described by `config` without installing it.
pub fn build_subscriber(config: &LogConfig) -> Result<impl tracing::Subscriber + Send + Sync> {
    let mut layers = console_layers(config);

    if let Some(path) = &config.log_file {
        let file = File::create(path).map_err(|e| {
            CoreError::Logging(format!("cannot open log file {}: {e}", path.display()))
        })?;
        layers.push(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_filter(LevelFilter::DEBUG)
                .boxed(),
        );
    }

    Ok(tracing_subscriber::registry().with(layers))
}

/// Install the subscriber described by `config` as the global default.
///
/// Only the first call takes effect; later calls return `Ok(())`.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    build_subscriber(config)?.try_init().ok();
    Ok(())
}
