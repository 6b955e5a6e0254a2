//! Push event payload model
//!
//! Payloads are parsed into a `serde_json::Value` first and the fields are
//! picked out one by one, so senders may omit, add or reshape anything except
//! `repository.name` without the request being rejected.

use serde_json::Value;

use crate::error::{HookError, Result};

/// A push notification from the source-control host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookEvent {
    pub before: Option<String>,
    pub after: Option<String>,
    pub git_ref: Option<String>,
    pub user_name: Option<String>,
    pub user_id: Option<i64>,
    pub project_id: Option<i64>,
    pub repository: RepositoryInfo,
    pub commits: Vec<CommitInfo>,
    pub total_commits_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryInfo {
    pub name: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitInfo {
    pub id: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<String>,
    pub url: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

impl WebhookEvent {
    /// Short description used in log lines.
    pub fn describe(&self) -> String {
        let git_ref = self.git_ref.as_deref().unwrap_or("(no ref)");
        let after = self
            .after
            .as_deref()
            .map(|sha| sha.get(..12).unwrap_or(sha))
            .unwrap_or("(none)");
        format!(
            "'{}' {} @ {} ({} commits)",
            self.repository.name,
            git_ref,
            after,
            self.total_commits_count.unwrap_or(self.commits.len() as u64)
        )
    }
}

/// Decode a request body into a [`WebhookEvent`].
///
/// Fails on malformed JSON or when there is no string `repository.name`.
pub fn decode_event(body: &[u8]) -> Result<WebhookEvent> {
    let payload: Value = serde_json::from_slice(body)?;

    let repository = payload.get("repository");
    let name = repository
        .and_then(|r| r.get("name"))
        .and_then(Value::as_str)
        .ok_or(HookError::MissingRepository)?;

    let commits = payload
        .get("commits")
        .and_then(Value::as_array)
        .map(|list| list.iter().map(commit_info).collect())
        .unwrap_or_default();

    Ok(WebhookEvent {
        before: string_field(&payload, "before"),
        after: string_field(&payload, "after"),
        git_ref: string_field(&payload, "ref"),
        user_name: string_field(&payload, "user_name"),
        user_id: payload.get("user_id").and_then(Value::as_i64),
        project_id: payload.get("project_id").and_then(Value::as_i64),
        repository: RepositoryInfo {
            name: name.to_string(),
            url: repository.and_then(|r| string_field(r, "url")),
            description: repository.and_then(|r| string_field(r, "description")),
            homepage: repository.and_then(|r| string_field(r, "homepage")),
        },
        commits,
        total_commits_count: payload.get("total_commits_count").and_then(Value::as_u64),
    })
}

fn commit_info(commit: &Value) -> CommitInfo {
    let author = commit.get("author");
    CommitInfo {
        id: string_field(commit, "id"),
        message: string_field(commit, "message"),
        timestamp: string_field(commit, "timestamp"),
        url: string_field(commit, "url"),
        author_name: author.and_then(|a| string_field(a, "name")),
        author_email: author.and_then(|a| string_field(a, "email")),
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(String::from)
}
