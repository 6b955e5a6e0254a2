pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod runner;
pub mod store;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_utils;

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::task::TaskTracker;

pub use config::{HookConfig, RepositoryRule};
pub use runner::{CommandResult, CommandRunner, ProcessRunner};
pub use store::{ConfigSnapshot, ConfigStore, ReloadTrigger};
pub use webhook::WebhookEvent;

/// Config path used when none is given on the command line or in the environment.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub runner: Arc<dyn CommandRunner>,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
    /// Background deliveries, waited for on shutdown.
    pub deliveries: TaskTracker,
}

impl AppState {
    pub fn new(store: Arc<ConfigStore>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            store,
            runner,
            start_time: Instant::now(),
            started_at: Utc::now(),
            deliveries: TaskTracker::new(),
        }
    }

    pub fn spawn_delivery<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.deliveries.spawn(task);
    }

    pub fn deliveries_in_flight(&self) -> usize {
        self.deliveries.len()
    }

    /// Stop accepting deliveries and wait up to `grace` for running ones.
    ///
    /// Returns false when the wait timed out.
    pub async fn wait_for_deliveries(&self, grace: Duration) -> bool {
        self.deliveries.close();
        tokio::time::timeout(grace, self.deliveries.wait())
            .await
            .is_ok()
    }
}

pub type SharedState = Arc<AppState>;
