pub mod aggregator;
pub mod backoff;
pub mod caldav;
pub mod ical;
pub mod manager;
pub mod rss;
pub mod weather;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tokio_util::sync::CancellationToken;

use crate::app::{Result, TributaryError};
use crate::domain::Payload;

pub use aggregator::CalendarAggregator;
pub use backoff::Backoff;
pub use caldav::CalDavSource;
pub use ical::ICalSource;
pub use manager::{Manager, Registration};
pub use rss::RssSource;
pub use weather::WeatherSource;

/// Per-request timeout for single round-trip sources.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A periodically polled upstream.
///
/// `fetch` performs one round trip (or a short fixed sequence of them) and
/// returns a normalized payload. Implementations abort in-flight requests when
/// `cancel` fires and bound every request with their own timeout.
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable identifier used as the state key.
    fn name(&self) -> &str;

    async fn fetch(&self, cancel: &CancellationToken) -> Result<Payload>;
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .user_agent(concat!("tributary/", env!("CARGO_PKG_VERSION")))
        .build()?;

    Ok(client)
}

/// Race `fut` against cancellation. Dropping the future aborts the request.
pub(crate) async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TributaryError::Cancelled),
        result = fut => result,
    }
}

/// Fail on anything but 200 OK.
pub(crate) fn ensure_ok(response: &Response) -> Result<()> {
    let status = response.status();
    if status != StatusCode::OK {
        return Err(TributaryError::Status(status.as_u16()));
    }
    Ok(())
}
