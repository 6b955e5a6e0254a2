//! Hot-reloadable configuration store
//!
//! The active configuration is an immutable [`ConfigSnapshot`] behind an `Arc`.
//! Readers clone the `Arc` and keep using their snapshot for as long as they
//! need it; a reload builds a complete new snapshot first and only then swaps
//! the pointer. The lock guards the swap, never the reads of config fields.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info, warn};

use crate::config::{HookConfig, load_config};
use crate::error::Result;

/// A fully loaded configuration, never mutated after publication.
#[derive(Debug)]
pub struct ConfigSnapshot {
    pub config: HookConfig,
    /// 1 for the startup load, incremented on every successful reload.
    pub generation: u64,
    pub loaded_at: DateTime<Utc>,
}

impl ConfigSnapshot {
    fn new(config: HookConfig, generation: u64) -> Self {
        Self {
            config,
            generation,
            loaded_at: Utc::now(),
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Arc<ConfigSnapshot>>,
    reload_lock: Mutex<()>,
}

impl ConfigStore {
    /// Load the configuration at `path` and build a store around it.
    ///
    /// This is the startup load; an error here means there is nothing to serve with.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = load_config(&path).await?;
        Ok(Self::with_config(path, config))
    }

    /// Build a store around an already decoded configuration.
    pub fn with_config(path: impl Into<PathBuf>, config: HookConfig) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(ConfigSnapshot::new(config, 1))),
            reload_lock: Mutex::new(()),
        }
    }

    /// Path used at startup and by [`ConfigStore::reload`].
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the latest successfully loaded snapshot.
    pub fn current(&self) -> Arc<ConfigSnapshot> {
        // The guarded value is a single Arc, so a poisoned lock still holds a whole snapshot.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Reload from the startup path.
    pub async fn reload(&self) -> Result<Arc<ConfigSnapshot>> {
        self.reload_from(&self.path).await
    }

    /// Load `path` and, only if that succeeds, publish it as the active snapshot.
    ///
    /// On failure the previous snapshot stays active and the error is returned.
    /// Concurrent calls are serialised.
    pub async fn reload_from(&self, path: &Path) -> Result<Arc<ConfigSnapshot>> {
        let _serial = self.reload_lock.lock().await;

        let config = load_config(path).await?;
        let previous = self.current();

        if previous.config.startup_fields_differ(&config) {
            warn!(
                "Logfile, Address or Port changed in {:?}; these apply after a restart",
                path
            );
        }

        let snapshot = Arc::new(ConfigSnapshot::new(config, previous.generation + 1));
        {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *guard = Arc::clone(&snapshot);
        }

        Ok(snapshot)
    }
}

/// Sending half of the reload channel.
///
/// Requests are coalesced: while one reload request is pending, further
/// requests are absorbed by it.
#[derive(Clone, Debug)]
pub struct ReloadTrigger {
    tx: mpsc::Sender<()>,
}

impl ReloadTrigger {
    /// Ask the reload loop to reload. Returns false once the loop has stopped.
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

pub type ReloadRequests = mpsc::Receiver<()>;

pub fn reload_channel() -> (ReloadTrigger, ReloadRequests) {
    let (tx, rx) = mpsc::channel(1);
    (ReloadTrigger { tx }, rx)
}

/// Performs reloads one at a time as requests arrive. Returns when every
/// [`ReloadTrigger`] has been dropped.
pub async fn run_reload_loop(store: Arc<ConfigStore>, mut requests: ReloadRequests) {
    while requests.recv().await.is_some() {
        match store.reload().await {
            Ok(snapshot) => info!(
                generation = snapshot.generation,
                repositories = snapshot.config.repositories.len(),
                "config reloaded from {:?}",
                store.path()
            ),
            Err(e) => error!(
                "Failed to reload config, keeping generation {}: {}",
                store.current().generation,
                e
            ),
        }
    }
    info!("Reload loop stopped");
}

/// Turn every SIGHUP into a reload request.
#[cfg(unix)]
pub async fn forward_hangup_signals(trigger: ReloadTrigger) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangups = signal(SignalKind::hangup())?;
    while hangups.recv().await.is_some() {
        info!("Received SIGHUP, reloading config");
        if !trigger.request() {
            break;
        }
    }
    Ok(())
}
