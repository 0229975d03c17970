//! Logging System
//!
//! Installs the global `tracing` subscriber:
//! - Configurable verbosity, globally and per module
//! - Text or JSON output on the console and/or rolling log files
//! - Old log files pruned on rollover

mod config;


pub use config::{default_log_directory, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig};

use std::path::PathBuf;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "correlation-sync";
const LOG_FILE_SUFFIX: &str = "log";

/// Logging system errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to initialize logging: {0}")]
    InitializationError(String),

    #[error("Failed to create log directory: {0}")]
    DirectoryCreationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for logging operations
pub type LoggingResult<T> = Result<T, LoggingError>;

/// Installed logging system
///
/// Dropping it flushes and stops the background file writer, so keep it
/// alive for the life of the process.
pub struct LoggingSystem {
    config: LoggingConfig,
    _guards: Vec<WorkerGuard>,
}

impl LoggingSystem {
    /// Initialize the logging system with the given configuration
    pub fn init(config: LoggingConfig) -> LoggingResult<Self> {
        let mut guards = Vec::new();
        let env_filter = build_env_filter(&config);
        let registry = tracing_subscriber::registry().with(env_filter);

        let result = match config.output {
            LogOutput::Console => registry.with(console_layer(&config)).try_init(),
            LogOutput::File => {
                let (file_layer, guard) = file_layer(&config)?;
                guards.push(guard);
                registry.with(file_layer).try_init()
            }
            LogOutput::Both => {
                let (file_layer, guard) = file_layer(&config)?;
                guards.push(guard);
                registry
                    .with(console_layer(&config))
                    .with(file_layer)
                    .try_init()
            }
        };
        result.map_err(|e| LoggingError::InitializationError(e.to_string()))?;

        tracing::info!(level = %config.level, output = ?config.output, "Logging initialized");

        Ok(Self {
            config,
            _guards: guards,
        })
    }

    /// Get current log directory
    pub fn log_directory(&self) -> Option<&PathBuf> {
        self.config.log_directory.as_ref()
    }

    pub fn log_level(&self) -> LogLevel {
        self.config.level
    }
}

/// Build the filter for a configuration
///
/// `RUST_LOG` directives, when set, are added after the configured ones and
/// therefore win for the same target.
pub fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::new(config.level.to_string());

    for (module, level) in &config.module_levels {
        match format!("{}={}", module, level).parse::<Directive>() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring log level for '{}': {}", module, e),
        }
    }

    if let Ok(env) = std::env::var(EnvFilter::DEFAULT_ENV) {
        for directive in env.split(',').filter_map(|d| d.parse::<Directive>().ok()) {
            filter = filter.add_directive(directive);
        }
    }

    filter
}

fn console_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info);

    if config.format == LogFormat::Json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

fn file_layer<S>(config: &LoggingConfig) -> LoggingResult<(Box<dyn Layer<S> + Send + Sync>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let log_dir = config
        .log_directory
        .clone()
        .unwrap_or_else(default_log_directory);
    std::fs::create_dir_all(&log_dir).map_err(|e| {
        LoggingError::DirectoryCreationError(format!("{}: {}", log_dir.display(), e))
    })?;

    let appender = RollingFileAppender::builder()
        .rotation(rotation(config.rotation))
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(config.max_files.max(1))
        .build(&log_dir)
        .map_err(|e| LoggingError::InitializationError(e.to_string()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(non_blocking)
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info)
        .with_ansi(false);

    if config.format == LogFormat::Json {
        Ok((layer.json().boxed(), guard))
    } else {
        Ok((layer.boxed(), guard))
    }
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Never => Rotation::NEVER,
    }
}
