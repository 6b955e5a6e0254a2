use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Custom error type for push_hook_runner operations
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Failed to read config file '{}': {}", .path.display(), .source)]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file '{}': {}", .path.display(), .source)]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse request: {0}")]
    RequestDecode(#[from] serde_json::Error),

    #[error("Failed to parse request: no repository.name in payload")]
    MissingRepository,

    #[error("Failed to execute command '{command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command '{command}' exited with {status}\n{stderr}")]
    CommandStatus {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Command '{command}' timed out after {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    #[error("Logging setup failed: {0}")]
    LoggingSetup(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl HookError {
    /// Whether this error came from reading or decoding the configuration file.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigRead { .. } | Self::ConfigParse { .. })
    }

    /// Whether this error came from decoding a webhook body.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::RequestDecode(_) | Self::MissingRepository)
    }
}

/// Helper type for Results that use HookError
pub type Result<T> = std::result::Result<T, HookError>;
