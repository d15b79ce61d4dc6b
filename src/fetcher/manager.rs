//! Periodic fetch scheduling.
//!
//! Every registered source gets its own loop: fetch immediately, publish the
//! outcome, then sleep for the configured interval after a success or for the
//! next backoff delay after a failure. All loops publish onto one bounded
//! channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::domain::FetchResult;
use crate::fetcher::{Backoff, Source};

pub const DEFAULT_BUFFER: usize = 32;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// A source plus its polling policy. Immutable once registered.
#[derive(Clone)]
pub struct Registration {
    pub source: Arc<dyn Source>,
    pub interval: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("source", &self.source.name())
            .field("interval", &self.interval)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .finish()
    }
}

pub struct Manager {
    registrations: Vec<Registration>,
    updates_tx: mpsc::Sender<FetchResult>,
    updates_rx: Option<mpsc::Receiver<FetchResult>>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    /// Create a manager whose update channel holds `buffer` results.
    ///
    /// A full channel blocks the publishing loop until the consumer catches up.
    pub fn with_buffer(buffer: usize) -> Self {
        let (updates_tx, updates_rx) = mpsc::channel(buffer.max(1));
        Self {
            registrations: Vec::new(),
            updates_tx,
            updates_rx: Some(updates_rx),
        }
    }

    /// Register with the default 1s..30s backoff.
    pub fn register(&mut self, source: Arc<dyn Source>, interval: Duration) {
        self.register_with_backoff(source, interval, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF);
    }

    pub fn register_with_backoff(
        &mut self,
        source: Arc<dyn Source>,
        interval: Duration,
        initial_backoff: Duration,
        max_backoff: Duration,
    ) {
        let max_backoff = if max_backoff < initial_backoff {
            tracing::warn!(
                source = source.name(),
                ?initial_backoff,
                ?max_backoff,
                "max backoff below initial backoff, clamping"
            );
            initial_backoff
        } else {
            max_backoff
        };

        self.registrations.push(Registration {
            source,
            interval,
            initial_backoff,
            max_backoff,
        });
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// The receiving end of the update stream. Available once.
    ///
    /// May be taken before or after [`Manager::start`]; results published in
    /// between are buffered.
    pub fn take_updates(&mut self) -> Option<mpsc::Receiver<FetchResult>> {
        self.updates_rx.take()
    }

    /// Run every registered loop until `cancel` fires.
    pub async fn start(&self, cancel: CancellationToken) {
        let mut loops = JoinSet::new();
        for registration in &self.registrations {
            loops.spawn(run_source(
                registration.clone(),
                self.updates_tx.clone(),
                cancel.clone(),
            ));
        }

        tracing::debug!(sources = self.registrations.len(), "fetch manager started");
        cancel.cancelled().await;

        loops.shutdown().await;
        tracing::debug!("fetch manager stopped");
    }
}

async fn run_source(
    registration: Registration,
    updates: mpsc::Sender<FetchResult>,
    cancel: CancellationToken,
) {
    let source = registration.source;
    let name = source.name().to_string();
    let mut backoff = Backoff::new(registration.initial_backoff, registration.max_backoff);
    let mut wait = Duration::ZERO;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = source.fetch(&cancel) => outcome,
        };

        let failed = outcome.is_err();
        let result = FetchResult::from_outcome(&name, outcome, Utc::now());
        if failed {
            tracing::warn!(source = %name, error = %result.status.error_message, "fetch failed");
        } else {
            tracing::debug!(source = %name, "fetch succeeded");
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = updates.send(result) => {
                if sent.is_err() {
                    tracing::debug!(source = %name, "update stream closed");
                    break;
                }
            }
        }

        wait = if failed {
            backoff.next_delay()
        } else {
            backoff.reset();
            registration.interval
        };
    }
}
