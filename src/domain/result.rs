use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::Result;
use crate::domain::{CalendarData, RssData, WeatherData};

/// Normalized payload produced by a source.
///
/// Serializes untagged so the wire shape is the inner value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Weather(WeatherData),
    Rss(RssData),
    Calendar(CalendarData),
    Json(serde_json::Value),
}

impl Payload {
    pub fn into_calendar(self) -> Option<CalendarData> {
        match self {
            Payload::Calendar(data) => Some(data),
            _ => None,
        }
    }
}

/// Metadata of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub last_fetch: DateTime<Utc>,
    pub is_healthy: bool,
    #[serde(rename = "error", skip_serializing_if = "String::is_empty")]
    pub error_message: String,
}

impl Status {
    pub fn healthy(at: DateTime<Utc>) -> Self {
        Self {
            last_fetch: at,
            is_healthy: true,
            error_message: String::new(),
        }
    }

    pub fn failed(at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            last_fetch: at,
            is_healthy: false,
            error_message: message.into(),
        }
    }
}

/// Outcome of exactly one fetch attempt, as published by the manager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    pub source_name: String,
    #[serde(rename = "data")]
    pub payload: Option<Payload>,
    pub status: Status,
}

impl FetchResult {
    /// Build the result of one attempt from the source's return value.
    pub fn from_outcome(source_name: &str, outcome: Result<Payload>, at: DateTime<Utc>) -> Self {
        match outcome {
            Ok(payload) => Self {
                source_name: source_name.to_string(),
                payload: Some(payload),
                status: Status::healthy(at),
            },
            Err(e) => Self {
                source_name: source_name.to_string(),
                payload: None,
                status: Status::failed(at, e.to_string()),
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy
    }
}
