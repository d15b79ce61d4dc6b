//! CalDAV calendars with basic auth.
//!
//! Discovery walks current-user-principal → calendar-home-set → the first
//! calendar collection. If any step fails or finds nothing, the configured URL
//! is queried directly as a calendar collection.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::app::{Result, TributaryError};
use crate::domain::{CalendarData, CalendarEvent, Payload};
use crate::fetcher::ical::parse_events;
use crate::fetcher::{cancellable, http_client, Source};

pub const CALDAV_TIMEOUT: Duration = Duration::from_secs(15);
/// Query window: this many hours back ...
pub const WINDOW_PAST_HOURS: i64 = 24;
/// ... through this many days ahead.
pub const WINDOW_FUTURE_DAYS: i64 = 30;

const PRINCIPAL_BODY: &str = r#"<d:propfind xmlns:d="DAV:">
  <d:prop><d:current-user-principal/></d:prop>
</d:propfind>"#;

const HOMESET_BODY: &str = r#"<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop><c:calendar-home-set/></d:prop>
</d:propfind>"#;

const CALENDARS_BODY: &str = r#"<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop><d:displayname/><d:resourcetype/></d:prop>
</d:propfind>"#;

pub struct CalDavSource {
    name: String,
    url: Url,
    username: String,
    password: String,
    client: Client,
}

impl CalDavSource {
    pub fn new(
        name: impl Into<String>,
        url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            url: Url::parse(url)?,
            username: username.into(),
            password: password.into(),
            client: http_client(CALDAV_TIMEOUT)?,
        })
    }

    async fn fetch_events(&self) -> Result<Payload> {
        let collection = match self.discover().await {
            Ok(Some(url)) => url,
            Ok(None) => {
                tracing::debug!(source = %self.name, "no calendars discovered, using configured url");
                self.url.clone()
            }
            Err(e) => {
                tracing::debug!(source = %self.name, error = %e, "discovery failed, using configured url");
                self.url.clone()
            }
        };

        let now = Utc::now();
        let start = now - chrono::Duration::hours(WINDOW_PAST_HOURS);
        let end = now + chrono::Duration::days(WINDOW_FUTURE_DAYS);
        let events = self.query(&collection, start, end).await?;

        Ok(Payload::Calendar(CalendarData {
            source: self.name.clone(),
            events,
        }))
    }

    async fn discover(&self) -> Result<Option<Url>> {
        let body = self.dav_request("PROPFIND", &self.url, 0, PRINCIPAL_BODY).await?;
        let principal = match href_of(&body, "current-user-principal")? {
            Some(href) => self.url.join(&href)?,
            None => self.url.clone(),
        };

        let body = self.dav_request("PROPFIND", &principal, 0, HOMESET_BODY).await?;
        let Some(home) = href_of(&body, "calendar-home-set")? else {
            return Ok(None);
        };
        let home = self.url.join(&home)?;

        let body = self.dav_request("PROPFIND", &home, 1, CALENDARS_BODY).await?;
        match calendar_collections(&body)?.into_iter().next() {
            Some(href) => Ok(Some(self.url.join(&href)?)),
            None => Ok(None),
        }
    }

    async fn query(
        &self,
        collection: &Url,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        let body = self
            .dav_request("REPORT", collection, 1, &query_body(start, end))
            .await
            .map_err(|e| TributaryError::CalDav(format!("query calendar failed at {collection}: {e}")))?;

        let mut events = Vec::new();
        for data in calendar_data(&body)? {
            events.extend(parse_events(&data)?);
        }
        Ok(events)
    }

    async fn dav_request(&self, method: &str, url: &Url, depth: u8, body: &str) -> Result<String> {
        let method =
            Method::from_bytes(method.as_bytes()).map_err(|e| TributaryError::CalDav(e.to_string()))?;

        let response = self
            .client
            .request(method, url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header("Depth", depth.to_string())
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(body.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TributaryError::Status(response.status().as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Source for CalDavSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<Payload> {
        cancellable(cancel, self.fetch_events()).await
    }
}

fn query_body(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        r#"<c:calendar-query xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop><d:getetag/><c:calendar-data/></d:prop>
  <c:filter>
    <c:comp-filter name="VCALENDAR">
      <c:comp-filter name="VEVENT">
        <c:time-range start="{}" end="{}"/>
      </c:comp-filter>
    </c:comp-filter>
  </c:filter>
</c:calendar-query>"#,
        start.format("%Y%m%dT%H%M%SZ"),
        end.format("%Y%m%dT%H%M%SZ")
    )
}

fn parse_xml(body: &str) -> Result<roxmltree::Document<'_>> {
    roxmltree::Document::parse(body).map_err(|e| TributaryError::CalDav(format!("invalid XML: {e}")))
}

/// The `href` nested in the first `property` element, if any.
fn href_of(body: &str, property: &str) -> Result<Option<String>> {
    let doc = parse_xml(body)?;
    let href = doc
        .descendants()
        .find(|n| n.tag_name().name() == property)
        .and_then(|prop| prop.descendants().find(|n| n.tag_name().name() == "href"))
        .and_then(|n| n.text())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok(href)
}

/// Hrefs of every response whose resourcetype includes `calendar`.
fn calendar_collections(body: &str) -> Result<Vec<String>> {
    let doc = parse_xml(body)?;
    let hrefs = doc
        .descendants()
        .filter(|n| n.tag_name().name() == "response")
        .filter(|response| {
            response
                .descendants()
                .filter(|n| n.tag_name().name() == "resourcetype")
                .any(|rt| rt.children().any(|c| c.tag_name().name() == "calendar"))
        })
        .filter_map(|response| {
            response
                .children()
                .find(|n| n.tag_name().name() == "href")
                .and_then(|n| n.text())
                .map(|s| s.trim().to_string())
        })
        .collect();
    Ok(hrefs)
}

/// Every `calendar-data` payload of a REPORT multistatus response.
fn calendar_data(body: &str) -> Result<Vec<String>> {
    let doc = parse_xml(body)?;
    let data = doc
        .descendants()
        .filter(|n| n.tag_name().name() == "response")
        .filter_map(|response| {
            response
                .descendants()
                .find(|n| n.tag_name().name() == "calendar-data")
                .and_then(|n| n.text())
                .map(str::to_string)
        })
        .collect();
    Ok(data)
}
