//! Configuration file model and loader

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{HookError, Result};

/// Used when `Address` is empty or missing.
const ALL_INTERFACES: &str = "0.0.0.0";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HookConfig {
    #[serde(rename = "Logfile")]
    pub log_file: String,
    #[serde(rename = "Address", default)]
    pub address: String,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Repositories", default)]
    pub repositories: Vec<RepositoryRule>,
    /// Seconds a single command may run before it is killed.
    #[serde(rename = "CommandTimeout", default)]
    pub command_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RepositoryRule {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Commands", default)]
    pub commands: Vec<String>,
}

impl HookConfig {
    /// Parse a configuration from raw JSON bytes.
    pub fn from_slice(bytes: &[u8], path: &Path) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| HookError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `address:port` string handed to the TCP listener.
    pub fn listen_address(&self) -> String {
        let host = if self.address.trim().is_empty() {
            ALL_INTERFACES
        } else {
            self.address.trim()
        };
        format!("{}:{}", host, self.port)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Returns the names of all configured repositories, in file order.
    pub fn repository_names(&self) -> Vec<&str> {
        self.repositories.iter().map(|r| r.name.as_str()).collect()
    }

    /// True if fields that are only applied at startup differ between `self` and `other`.
    pub fn startup_fields_differ(&self, other: &HookConfig) -> bool {
        self.log_file != other.log_file || self.listen_address() != other.listen_address()
    }
}

/// Read the whole configuration file and decode it.
pub async fn load_config(path: impl AsRef<Path>) -> Result<HookConfig> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| HookError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

    HookConfig::from_slice(&bytes, path)
}
