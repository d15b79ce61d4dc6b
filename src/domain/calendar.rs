use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized calendar event shared by every calendar-family source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub location: String,
    pub description: String,
    pub status: String,
    pub all_day: bool,
}

impl CalendarEvent {
    pub fn new(summary: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            summary: summary.into(),
            start,
            end: None,
            location: String::new(),
            description: String::new(),
            status: String::new(),
            all_day: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarData {
    pub source: String,
    pub events: Vec<CalendarEvent>,
}
