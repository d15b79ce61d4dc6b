use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::app::Result;
use crate::domain::Payload;
use crate::fetcher::{cancellable, ensure_ok, http_client, Source, DEFAULT_TIMEOUT};
use crate::normalizer::Normalizer;

/// Latest items of an RSS/Atom feed.
pub struct RssSource {
    name: String,
    url: String,
    client: Client,
    normalizer: Normalizer,
}

impl RssSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            url: url.into(),
            client: http_client(DEFAULT_TIMEOUT)?,
            normalizer: Normalizer::new(),
        })
    }

    async fn fetch_feed(&self) -> Result<Payload> {
        let response = self.client.get(&self.url).send().await?;
        ensure_ok(&response)?;

        let body = response.bytes().await?;
        let data = self.normalizer.normalize(&self.name, &body)?;
        tracing::debug!(source = %self.name, items = data.items.len(), "parsed feed");

        Ok(Payload::Rss(data))
    }
}

#[async_trait]
impl Source for RssSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<Payload> {
        cancellable(cancel, self.fetch_feed()).await
    }
}
