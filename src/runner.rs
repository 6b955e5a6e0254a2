//! External command execution

use async_trait::async_trait;
use std::io;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::HookError;

/// Outcome of one command invocation. Failures are data, never panics.
#[derive(Debug)]
pub struct CommandResult {
    pub command: String,
    pub succeeded: bool,
    /// Captured standard output.
    pub output: Vec<u8>,
    pub error: Option<HookError>,
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(command: &str, output: Vec<u8>, duration: Duration) -> Self {
        Self {
            command: command.to_string(),
            succeeded: true,
            output,
            error: None,
            exit_code: Some(0),
            duration,
        }
    }

    pub fn failure(command: &str, error: HookError, duration: Duration) -> Self {
        Self {
            command: command.to_string(),
            succeeded: false,
            output: Vec::new(),
            error: Some(error),
            exit_code: None,
            duration,
        }
    }

    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Runs a single configured command.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` with no arguments and wait for it, up to `timeout` if given.
    async fn run(&self, command: &str, timeout: Option<Duration>) -> CommandResult;
}

/// Spawns commands as child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &str, timeout: Option<Duration>) -> CommandResult {
        let started = Instant::now();
        debug!("Running: {}", command);

        let mut cmd = Command::new(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Children outlive a dropped task or runtime; only a timeout kills them.
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                return CommandResult::failure(
                    command,
                    HookError::CommandSpawn {
                        command: command.to_string(),
                        source,
                    },
                    started.elapsed(),
                );
            }
        };

        let output = match timeout {
            Some(limit) => match tokio::time::timeout(limit, collect_output(&mut child)).await {
                Ok(output) => output,
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill timed out command '{}': {}", command, e);
                    }
                    return CommandResult::failure(
                        command,
                        HookError::CommandTimeout {
                            command: command.to_string(),
                            timeout: limit,
                        },
                        started.elapsed(),
                    );
                }
            },
            None => collect_output(&mut child).await,
        };

        match output {
            Ok(output) => from_output(command, output, started.elapsed()),
            Err(source) => CommandResult::failure(
                command,
                HookError::CommandSpawn {
                    command: command.to_string(),
                    source,
                },
                started.elapsed(),
            ),
        }
    }
}

/// Wait for exit while draining both pipes, so a chatty child cannot block on a full pipe.
async fn collect_output(child: &mut Child) -> io::Result<Output> {
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let read_stdout = async {
        let mut buf = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok::<_, io::Error>(buf)
    };
    let read_stderr = async {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok::<_, io::Error>(buf)
    };

    let (status, stdout, stderr) = tokio::try_join!(child.wait(), read_stdout, read_stderr)?;
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

fn from_output(command: &str, output: Output, duration: Duration) -> CommandResult {
    if output.status.success() {
        return CommandResult::success(command, output.stdout, duration);
    }

    let error = HookError::CommandStatus {
        command: command.to_string(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };
    CommandResult {
        command: command.to_string(),
        succeeded: false,
        output: output.stdout,
        error: Some(error),
        exit_code: output.status.code(),
        duration,
    }
}
