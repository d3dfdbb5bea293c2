//! Versioned, shared configuration value.
//!
//! Readers take a snapshot whenever they need one; writers swap the whole
//! value and bump a version that [`ConfigWatcher`]s can await.

use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, watch};

/// A value that can be replaced at runtime, e.g. on config reload.
pub struct ConfigStore<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    data: RwLock<T>,
    version_tx: watch::Sender<u64>,
}

/// Waits for the next [`ConfigStore::update`].
pub struct ConfigWatcher {
    version_rx: watch::Receiver<u64>,
}

impl<T> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        let (version_tx, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(Inner {
                data: RwLock::new(initial),
                version_tx,
            }),
        }
    }

    /// Replace the value and notify watchers. Returns the new version.
    pub async fn update(&self, value: T) -> u64 {
        *self.inner.data.write().await = value;
        let mut version = 0;
        self.inner.version_tx.send_modify(|v| {
            *v += 1;
            version = *v;
        });
        version
    }

    /// Edit the value in place under the write lock. Watchers are notified
    /// only when `edit` returns `true`; returns the version after the call.
    pub async fn modify<F>(&self, edit: F) -> u64
    where
        F: FnOnce(&mut T) -> bool,
    {
        let mut data = self.inner.data.write().await;
        if !edit(&mut *data) {
            return self.version();
        }
        let mut version = 0;
        self.inner.version_tx.send_modify(|v| {
            *v += 1;
            version = *v;
        });
        version
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.data.read().await
    }

    /// Number of updates applied since creation.
    pub fn version(&self) -> u64 {
        *self.inner.version_tx.borrow()
    }

    pub fn subscribe(&self) -> ConfigWatcher {
        ConfigWatcher {
            version_rx: self.inner.version_tx.subscribe(),
        }
    }
}

impl<T: Clone> ConfigStore<T> {
    /// Clone of the current value; the lock is released on return.
    pub async fn snapshot(&self) -> T {
        self.inner.data.read().await.clone()
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ConfigWatcher {
    /// Resolves with the new version once the store is updated, or fails if
    /// every [`ConfigStore`] handle was dropped.
    pub async fn changed(&mut self) -> Result<u64, watch::error::RecvError> {
        self.version_rx.changed().await?;
        Ok(*self.version_rx.borrow_and_update())
    }
}
