//! Summary cleanup for feed items.
//!
//! Feed descriptions often repeat the item title and carry HTML markup.
//! [`clean_summary`] strips the markup and drops a leading copy of the title,
//! matching it loosely (case, punctuation and spacing are ignored).

use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static LEADING_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s,.\-–—:]+").expect("valid regex"));
static BLOCK_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?(a|li|p|div|br|h[1-6])[^>]*>").expect("valid regex"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Lowercase, drop everything but ASCII letters, digits and whitespace, then
/// collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = NON_ALPHANUMERIC.replace_all(&lower, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Remove HTML tags and entities, keeping word boundaries at block elements.
pub fn strip_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let spaced = BLOCK_TAGS.replace_all(html, " ");
    let untagged = ANY_TAG.replace_all(&spaced, "");
    let decoded = decode_html_entities(&untagged);
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

/// Clean a feed summary against its title.
///
/// Returns an empty string when the summary is nothing but the title.
pub fn clean_summary(summary: &str, title: &str) -> String {
    let summary = strip_html(summary);
    if summary.is_empty() {
        return String::new();
    }

    let mut rest = summary.as_str();
    if normalize_text(&summary).starts_with(&normalize_text(title)) {
        let matched = title_prefix_len(&summary, title);
        if matched >= summary.chars().count() {
            return String::new();
        }
        if matched > 0 {
            let offset = summary
                .char_indices()
                .nth(matched)
                .map(|(i, _)| i)
                .unwrap_or(summary.len());
            rest = &summary[offset..];
        }
    }

    LEADING_PUNCTUATION.replace(rest, "").trim().to_string()
}

/// Number of leading characters of `summary` needed to cover every letter and
/// digit of `title`, in order. Non-alphanumeric characters on either side are
/// skipped.
fn title_prefix_len(summary: &str, title: &str) -> usize {
    let wanted: Vec<char> = normalize_text(title)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if wanted.is_empty() {
        return 0;
    }

    let mut matched = 0;
    let mut consumed = 0;
    for c in summary.chars() {
        if matched == wanted.len() {
            break;
        }
        let lower = c.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() && lower == wanted[matched] {
            matched += 1;
        }
        consumed += 1;
    }
    consumed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_summary_cases() {
        let cases = [
            ("no overlap", "This is a summary.", "Different Title", "This is a summary."),
            (
                "exact overlap",
                "Breaking News: Something happened. More details here.",
                "Breaking News: Something happened",
                "More details here.",
            ),
            (
                "fuzzy overlap",
                "Breaking News - Something happened. More details.",
                "Breaking News: Something happened",
                "More details.",
            ),
            ("html strip", "<p><b>Bold</b> summary</p>", "Title", "Bold summary"),
            ("title equals summary", "Just the title", "Just the title", ""),
            ("empty summary", "", "Anything", ""),
            ("markup only", "<p></p><br/>", "Anything", ""),
        ];

        for (name, summary, title, want) in cases {
            assert_eq!(clean_summary(summary, title), want, "case: {name}");
        }
    }

    #[test]
    fn test_block_tags_keep_words_apart() {
        assert_eq!(strip_html("<p>one</p><p>two</p>"), "one two");
        assert_eq!(strip_html("line<br>break"), "line break");
        assert_eq!(strip_html("in<b>line</b>"), "inline");
    }

    #[test]
    fn test_strip_html_decodes_entities() {
        assert_eq!(strip_html("Fish&nbsp;&amp;&nbsp;Chips"), "Fish & Chips");
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Hello,   World!! 42 "), "hello world 42");
        assert_eq!(normalize_text("---"), "");
    }

    #[test]
    fn test_empty_title_leaves_summary() {
        assert_eq!(clean_summary("- Body text", ""), "Body text");
    }

    #[test]
    fn test_non_ascii_summary_is_sliced_on_char_boundary() {
        assert_eq!(
            clean_summary("Café opens — doors at nine", "Caf opens"),
            "doors at nine"
        );
    }

    #[test]
    fn test_title_prefix_len_counts_chars() {
        assert_eq!(title_prefix_len("A-B-C rest", "abc"), 5);
        assert_eq!(title_prefix_len("anything", ""), 0);
    }
}
