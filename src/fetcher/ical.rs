//! iCalendar (.ics) feeds.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use icalendar::parser::{read_calendar, unfold, Component, Property};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::app::{Result, TributaryError};
use crate::domain::{CalendarData, CalendarEvent, Payload};
use crate::fetcher::{cancellable, ensure_ok, http_client, Source, DEFAULT_TIMEOUT};

/// Events that ended more than this many hours ago are dropped.
pub const PAST_GRACE_HOURS: i64 = 1;
/// Events starting more than this many days ahead are dropped.
pub const LOOKAHEAD_DAYS: i64 = 7;

pub struct ICalSource {
    name: String,
    url: String,
    client: Client,
}

impl ICalSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            url: url.into(),
            client: http_client(DEFAULT_TIMEOUT)?,
        })
    }

    async fn fetch_calendar(&self) -> Result<Payload> {
        let response = self.client.get(&self.url).send().await?;
        ensure_ok(&response)?;

        let body = response.text().await?;
        let events = within_window(parse_events(&body)?, Utc::now());
        tracing::debug!(source = %self.name, events = events.len(), "parsed calendar");

        Ok(Payload::Calendar(CalendarData {
            source: self.name.clone(),
            events,
        }))
    }
}

#[async_trait]
impl Source for ICalSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, cancel: &CancellationToken) -> Result<Payload> {
        cancellable(cancel, self.fetch_calendar()).await
    }
}

/// Keep events that have not ended more than [`PAST_GRACE_HOURS`] before
/// `now` and start no later than [`LOOKAHEAD_DAYS`] after it.
pub fn within_window(events: Vec<CalendarEvent>, now: DateTime<Utc>) -> Vec<CalendarEvent> {
    let ended_cutoff = now - Duration::hours(PAST_GRACE_HOURS);
    let start_cutoff = now + Duration::days(LOOKAHEAD_DAYS);

    events
        .into_iter()
        .filter(|event| !event.end.is_some_and(|end| end < ended_cutoff))
        .filter(|event| event.start <= start_cutoff)
        .collect()
}

/// Parse every VEVENT of an iCalendar document.
///
/// Events without a usable DTSTART are skipped.
pub fn parse_events(text: &str) -> Result<Vec<CalendarEvent>> {
    let unfolded = unfold(text);
    let calendar = read_calendar(&unfolded).map_err(TributaryError::CalendarParse)?;

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    Ok(vevents.into_iter().filter_map(to_event).collect())
}

fn collect_vevents<'c, 'a>(components: &'c [Component<'a>], out: &mut Vec<&'c Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else {
            collect_vevents(&component.components, out);
        }
    }
}

fn to_event(vevent: &Component<'_>) -> Option<CalendarEvent> {
    let start_prop = vevent.find_prop("DTSTART")?;
    let start_value = DatePerhapsTime::try_from(start_prop).ok()?;
    let all_day = matches!(start_value, DatePerhapsTime::Date(_)) || is_date_value(start_prop);
    let start = to_utc(start_value)?;

    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .and_then(to_utc);

    let text = |name: &str| {
        vevent
            .find_prop(name)
            .map(|p| unescape(p.val.as_ref()))
            .unwrap_or_default()
    };

    Some(CalendarEvent {
        summary: text("SUMMARY"),
        start,
        end,
        location: text("LOCATION"),
        description: text("DESCRIPTION"),
        status: text("STATUS"),
        all_day,
    })
}

fn is_date_value(prop: &Property<'_>) -> bool {
    prop.params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"))
}

/// Resolve an iCalendar time to UTC. Floating times and bare dates are read
/// in the local timezone.
fn to_utc(value: DatePerhapsTime) -> Option<DateTime<Utc>> {
    match value {
        DatePerhapsTime::Date(date) => local_to_utc(&date.and_hms_opt(0, 0, 0)?),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Some(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => local_to_utc(&naive),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match tzid.parse::<chrono_tz::Tz>() {
                Ok(tz) => resolve_local(&tz, &date_time),
                Err(_) => {
                    tracing::debug!(%tzid, "unknown TZID, using local time");
                    local_to_utc(&date_time)
                }
            }
        }
    }
}

fn local_to_utc(naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    resolve_local(&Local, naive)
}

/// Ambiguous times take the earlier instant. Times skipped by a DST jump are
/// moved forward by the usual one-hour gap.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(*naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
