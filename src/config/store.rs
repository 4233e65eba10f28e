//! Shared, reloadable configuration.
//!
//! Readers take a cheap snapshot with [`ConfigStore::current`]; components
//! that react to reloads hold a [`watch::Receiver`] from [`ConfigStore::subscribe`].

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::common::error::ConfigError;
use crate::config::parser::load_and_validate;
use crate::config::types::Config;

#[derive(Clone)]
pub struct ConfigStore {
    tx: Arc<watch::Sender<Arc<Config>>>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        let (tx, _) = watch::channel(Arc::new(config));
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current configuration.
    pub fn current(&self) -> Arc<Config> {
        self.tx.borrow().clone()
    }

    /// Replace the configuration and notify all subscribers.
    pub fn replace(&self, config: Config) {
        self.tx.send_replace(Arc::new(config));
    }

    /// Receiver that is notified on every subsequent replacement.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Config>> {
        self.tx.subscribe()
    }

    /// Reload from disk. The current configuration is kept if the file is invalid.
    pub fn reload_from(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let config = load_and_validate(path)?;
        self.replace(config);
        info!("Configuration reloaded from {}", path.display());
        Ok(())
    }
}
