//! Latest-result-per-source state and the coordinator that fills it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::FetchResult;

/// Shared map from source name to its most recent [`FetchResult`].
///
/// Reads take a shared lock and clone out, so no reader ever observes a
/// partially written entry.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    inner: Arc<RwLock<HashMap<String, FetchResult>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source_name: &str) -> Option<FetchResult> {
        self.read().get(source_name).cloned()
    }

    /// A point-in-time copy of every entry.
    pub fn snapshot(&self) -> HashMap<String, FetchResult> {
        self.read().clone()
    }

    /// Replace the entry for `result.source_name`. Failed results replace
    /// earlier successes too.
    pub fn insert(&self, result: FetchResult) {
        self.write().insert(result.source_name.clone(), result);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A writer panicking mid-insert cannot leave a torn entry behind, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, FetchResult>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, FetchResult>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Drains the manager's result stream into a [`StateStore`].
pub struct Coordinator {
    store: StateStore,
}

impl Coordinator {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    /// Apply results in arrival order until the stream closes or `cancel` fires.
    pub async fn run(&self, mut updates: mpsc::Receiver<FetchResult>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("coordinator cancelled");
                    break;
                }
                next = updates.recv() => match next {
                    Some(result) => {
                        tracing::debug!(
                            source = %result.source_name,
                            healthy = result.is_healthy(),
                            "state updated"
                        );
                        self.store.insert(result);
                    }
                    None => {
                        tracing::debug!("update stream closed");
                        break;
                    }
                },
            }
        }
    }
}
