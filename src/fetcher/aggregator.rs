//! Merges several calendar sources into one chronological payload.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::app::Result;
use crate::domain::{CalendarData, Payload};
use crate::fetcher::Source;

/// A composite source over calendar children.
///
/// Children are fetched concurrently. Failed children are logged and skipped;
/// the aggregate fails only when every child failed, with the first error in
/// child order.
pub struct CalendarAggregator {
    name: String,
    sources: Vec<Arc<dyn Source>>,
}

impl CalendarAggregator {
    pub fn new(name: impl Into<String>, sources: Vec<Arc<dyn Source>>) -> Self {
        Self {
            name: name.into(),
            sources,
        }
    }
}

#[async_trait]
impl Source for CalendarAggregator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<Payload> {
        let outcomes = join_all(self.sources.iter().map(|s| s.fetch(cancel))).await;

        let mut events = Vec::new();
        let mut first_error = None;
        let mut failures = 0;

        for (source, outcome) in self.sources.iter().zip(outcomes) {
            match outcome {
                Ok(Payload::Calendar(data)) => events.extend(data.events),
                Ok(_) => {
                    tracing::warn!(
                        aggregate = %self.name,
                        source = source.name(),
                        "ignoring non-calendar payload"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        aggregate = %self.name,
                        source = source.name(),
                        error = %e,
                        "calendar source failed"
                    );
                    failures += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        if failures == self.sources.len() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        // Stable: equal start times keep child order.
        events.sort_by_key(|e| e.start);

        Ok(Payload::Calendar(CalendarData {
            source: self.name.clone(),
            events,
        }))
    }
}
