use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single cleaned entry from an RSS/Atom feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub pub_date: Option<DateTime<Utc>>,
    pub summary: String,
}

/// The most recent items of one feed, in upstream order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RssData {
    pub feed_name: String,
    pub items: Vec<RssItem>,
}
