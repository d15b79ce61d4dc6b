pub mod cleaner;

use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{Result, TributaryError};
use crate::domain::{RssData, RssItem};

pub use cleaner::clean_summary;

/// Number of entries kept from each feed.
pub const MAX_ITEMS: usize = 5;

#[derive(Clone)]
pub struct Normalizer {
    max_items: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            max_items: MAX_ITEMS,
        }
    }

    /// Parse an RSS/Atom/JSON feed body into the first `max_items` entries, in
    /// upstream order, with cleaned summaries.
    pub fn normalize(&self, feed_name: &str, body: &[u8]) -> Result<RssData> {
        let feed = parser::parse(body).map_err(|e| TributaryError::FeedParse(e.to_string()))?;

        let items = feed
            .entries
            .into_iter()
            .take(self.max_items)
            .map(|entry| {
                let title = entry
                    .title
                    .map(|t| decode_html_entities(&t.content).to_string())
                    .unwrap_or_default();
                let raw_summary = entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .unwrap_or_default();

                RssItem {
                    summary: clean_summary(&raw_summary, &title),
                    title,
                    link: entry
                        .links
                        .first()
                        .map(|l| l.href.clone())
                        .unwrap_or_default(),
                    pub_date: entry.published.or(entry.updated),
                }
            })
            .collect();

        Ok(RssData {
            feed_name: feed_name.to_string(),
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rss_with_items(count: usize) -> String {
        let items: String = (1..=count)
            .map(|i| {
                format!(
                    "<item><title>Item {i}</title><link>https://example.com/{i}</link>\
                     <description>Item {i}: details for {i}</description></item>"
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Test Feed</title>{items}</channel></rss>"#
        )
    }

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Test Feed</title>
  <entry>
    <title>Atom Entry 1</title>
    <link href="https://example.com/atom1"/>
    <id>atom-entry-1</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <summary>This is Atom entry 1</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_truncates_to_first_five_in_order() {
        let normalizer = Normalizer::new();
        let data = normalizer
            .normalize("news", rss_with_items(6).as_bytes())
            .unwrap();

        assert_eq!(data.feed_name, "news");
        assert_eq!(data.items.len(), 5);
        let titles: Vec<_> = data.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Item 1", "Item 2", "Item 3", "Item 4", "Item 5"]);
        assert_eq!(data.items[0].link, "https://example.com/1");
    }

    #[test]
    fn test_short_feed_is_kept_whole() {
        let data = Normalizer::new()
            .normalize("news", rss_with_items(2).as_bytes())
            .unwrap();
        assert_eq!(data.items.len(), 2);
    }

    #[test]
    fn test_summaries_are_cleaned() {
        let data = Normalizer::new()
            .normalize("news", rss_with_items(1).as_bytes())
            .unwrap();
        assert_eq!(data.items[0].summary, "details for 1");
    }

    #[test]
    fn test_parse_atom() {
        let data = Normalizer::new()
            .normalize("atom", ATOM_SAMPLE.as_bytes())
            .unwrap();

        assert_eq!(data.items.len(), 1);
        assert_eq!(data.items[0].title, "Atom Entry 1");
        assert_eq!(data.items[0].link, "https://example.com/atom1");
        assert_eq!(data.items[0].summary, "This is Atom entry 1");
        assert!(data.items[0].pub_date.is_some());
    }

    #[test]
    fn test_malformed_body_is_an_error() {
        let err = Normalizer::new()
            .normalize("broken", b"this is not a feed")
            .unwrap_err();
        assert!(matches!(err, TributaryError::FeedParse(_)));
    }
}
