use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{HookError, Result};

const DEFAULT_LOG_FILTER: &str = "info";

/// Append-only log file sink.
///
/// All writes go through one background worker, so lines from concurrent
/// requests never interleave. The writer blocks instead of dropping lines
/// when the worker falls behind.
pub struct FileLogger {
    log_directory: PathBuf,
    file_name: String,
}

impl FileLogger {
    pub fn new(log_file: impl AsRef<Path>) -> Result<Self> {
        let log_file = log_file.as_ref();
        let file_name = log_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                HookError::LoggingSetup(format!("'{}' is not a file path", log_file.display()))
            })?;
        let log_directory = match log_file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            log_directory,
            file_name,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.log_directory.join(&self.file_name)
    }

    /// Open the file in append mode behind a lossless non-blocking writer.
    pub fn setup_file_logging(&self) -> Result<(NonBlocking, WorkerGuard)> {
        std::fs::create_dir_all(&self.log_directory).map_err(|e| {
            HookError::LoggingSetup(format!(
                "Failed to create log directory '{}': {}",
                self.log_directory.display(),
                e
            ))
        })?;

        // `never` appends to a single file without rotation.
        let file_appender = tracing_appender::rolling::never(&self.log_directory, &self.file_name);
        Ok(NonBlockingBuilder::default()
            .lossy(false)
            .finish(file_appender))
    }
}

/// Plain-text formatting layer writing to the log file.
pub fn file_layer<S>(writer: NonBlocking) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
}

/// Install the global subscriber: console output plus the log file.
///
/// The returned guard flushes the file on drop and must live as long as the process.
pub fn setup_logging(file_logger: &FileLogger) -> Result<WorkerGuard> {
    let (file_writer, guard) = file_logger.setup_file_logging()?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer()) // Console output
        .with(file_layer(file_writer))
        .try_init()
        .map_err(|e| HookError::LoggingSetup(e.to_string()))?;

    Ok(guard)
}
