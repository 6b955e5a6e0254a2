//! Matching webhook events to repository rules and running their commands

use tracing::{error, info};

use crate::config::{HookConfig, RepositoryRule};
use crate::runner::{CommandResult, CommandRunner};
use crate::webhook::WebhookEvent;

/// All rules whose name equals `repo_name` exactly, in configuration order.
pub fn matching_rules<'a>(
    config: &'a HookConfig,
    repo_name: &'a str,
) -> impl Iterator<Item = &'a RepositoryRule> + 'a {
    config
        .repositories
        .iter()
        .filter(move |rule| rule.name == repo_name)
}

/// Run the commands of every rule matching the event's repository.
///
/// Commands run one after another in listed order. A failing command is
/// logged and the next one still runs; every matching rule is processed,
/// not only the first. No match gives an empty result.
pub async fn dispatch(
    event: &WebhookEvent,
    config: &HookConfig,
    runner: &dyn CommandRunner,
) -> Vec<CommandResult> {
    let timeout = config.command_timeout();
    let mut results = Vec::new();

    for rule in matching_rules(config, &event.repository.name) {
        for command in &rule.commands {
            let result = runner.run(command, timeout).await;
            log_result(&rule.name, &result);
            results.push(result);
        }
    }

    results
}

fn log_result(repository: &str, result: &CommandResult) {
    if result.succeeded {
        info!(
            repository,
            command = %result.command,
            duration_ms = result.duration.as_millis() as u64,
            "Executed: {}",
            result.command
        );
        info!(repository, command = %result.command, "Output: {}", result.output_lossy());
    } else {
        let detail = result
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        error!(
            repository,
            command = %result.command,
            exit_code = ?result.exit_code,
            "Failed to execute command: {}",
            detail
        );
    }
}
