#![allow(dead_code)]

use axum::Router;
use chrono::{DateTime, Duration, Utc};
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn rss_feed(items: usize) -> String {
    let entries: String = (1..=items)
        .map(|i| {
            format!(
                "<item><title>Story {i}</title><link>https://example.com/{i}</link>\
                 <description>&lt;p&gt;Story {i}: body of story {i}&lt;/p&gt;</description>\
                 <pubDate>0{d} Jan 2024 10:00:00 GMT</pubDate></item>",
                d = (i % 9) + 1
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Example</title>
<link>https://example.com</link><description>Example feed</description>{entries}</channel></rss>"#
    )
}

pub fn ical_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

/// A VCALENDAR with one event per `(summary, start offset in hours)`.
pub fn ical_calendar(events: &[(&str, i64)]) -> String {
    let now = Utc::now();
    let mut body = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//tests//EN\r\n");
    for (i, (summary, hours)) in events.iter().enumerate() {
        let start = now + Duration::hours(*hours);
        let end = start + Duration::minutes(30);
        body.push_str(&format!(
            "BEGIN:VEVENT\r\nUID:{i}@tests\r\nSUMMARY:{summary}\r\nDTSTART:{}\r\nDTEND:{}\r\nEND:VEVENT\r\n",
            ical_stamp(start),
            ical_stamp(end)
        ));
    }
    body.push_str("END:VCALENDAR\r\n");
    body
}
