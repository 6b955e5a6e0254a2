//! Shared test helpers.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::{HookConfig, RepositoryRule};
use crate::error::HookError;
use crate::runner::{CommandResult, CommandRunner};

/// Records every command it is asked to run instead of spawning anything.
///
/// Commands listed in `failing` report a non-zero exit.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<String>>,
    failing: HashSet<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(commands: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: commands.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str, _timeout: Option<Duration>) -> CommandResult {
        self.calls.lock().unwrap().push(command.to_string());

        if self.failing.contains(command) {
            CommandResult::failure(
                command,
                HookError::CommandStatus {
                    command: command.to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: String::new(),
                },
                Duration::ZERO,
            )
        } else {
            CommandResult::success(command, format!("ran {command}\n").into_bytes(), Duration::ZERO)
        }
    }
}

pub fn rule(name: &str, commands: &[&str]) -> RepositoryRule {
    RepositoryRule {
        name: name.to_string(),
        commands: commands.iter().map(|c| c.to_string()).collect(),
    }
}

pub fn config_with(repositories: Vec<RepositoryRule>) -> HookConfig {
    HookConfig {
        log_file: "hooks.log".to_string(),
        address: "127.0.0.1".to_string(),
        port: 8080,
        repositories,
        command_timeout_secs: None,
    }
}
