//! Pattern extraction over raw page HTML.
//!
//! The page embeds its video URLs as JSON string literals inside a large
//! inline script, so the rules match the literal key text rather than any
//! document structure. Every rule is independent and absence is never an
//! error.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Title reported when the page has no `<title>` element.
pub const NO_TITLE: &str = "No Title";

/// Suffix that asks the CDN for an attachment download instead of inline playback.
const DOWNLOAD_SUFFIX: &str = "&dl=1";

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title>(.*?)</title>").expect("TITLE regex"));
static TRAILING_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)/?$").expect("TRAILING_ID regex"));
static SD_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"browser_native_sd_url":"([^"]+)""#).expect("SD_URL regex"));
static HD_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"browser_native_hd_url":"([^"]+)""#).expect("HD_URL regex"));

/// Video resolution offered by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quality {
    Low,
    High,
}

impl Quality {
    pub const ALL: [Quality; 2] = [Quality::Low, Quality::High];

    /// Human-readable label used as the key of the `links` map.
    pub fn label(self) -> &'static str {
        match self {
            Quality::Low => "Download Low Quality(360p)",
            Quality::High => "Download High Quality(720p)",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Quality::Low => &*SD_URL,
            Quality::High => &*HD_URL,
        }
    }
}

/// Text of the first `<title>` element, or [`NO_TITLE`].
pub fn extract_title(html: &str) -> String {
    TITLE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NO_TITLE.to_string())
}

/// Trailing digit run of the request URL (a single trailing `/` is allowed).
pub fn extract_video_id(url: &str) -> String {
    TRAILING_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Video link for `quality`, unescaped, or an empty string.
pub fn extract_link(html: &str, quality: Quality) -> String {
    quality
        .pattern()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| unescape_link(m.as_str()))
        .unwrap_or_default()
}

pub fn extract_sd_link(html: &str) -> String {
    extract_link(html, Quality::Low)
}

pub fn extract_hd_link(html: &str) -> String {
    extract_link(html, Quality::High)
}

/// Undo the two escapes the page applies to its URLs: `\u0025` and `\/`.
fn unescape_link(raw: &str) -> String {
    raw.replace(r"\u0025", "%").replace(r"\/", "/")
}

/// Everything the extractor found on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub id: String,
    pub title: String,
    pub low: Option<String>,
    pub high: Option<String>,
}

impl ExtractedRecord {
    /// Run all four rules: the id comes from `url`, the rest from `html`.
    ///
    /// ```
    /// use stelle_scraper::{ExtractedRecord, Quality};
    ///
    /// let html = r#"<title>Clip</title>"browser_native_hd_url":"https:\/\/cdn.example\/v.mp4?a=1""#;
    /// let record = ExtractedRecord::from_page("https://www.example.com/watch/42/", html);
    ///
    /// assert_eq!(record.id, "42");
    /// assert_eq!(record.title, "Clip");
    /// assert_eq!(record.link(Quality::High), Some("https://cdn.example/v.mp4?a=1"));
    /// assert_eq!(record.link(Quality::Low), None);
    /// ```
    pub fn from_page(url: &str, html: &str) -> Self {
        let non_empty = |s: String| (!s.is_empty()).then_some(s);
        Self {
            id: extract_video_id(url),
            title: extract_title(html),
            low: non_empty(extract_sd_link(html)),
            high: non_empty(extract_hd_link(html)),
        }
    }

    pub fn link(&self, quality: Quality) -> Option<&str> {
        match quality {
            Quality::Low => self.low.as_deref(),
            Quality::High => self.high.as_deref(),
        }
    }

    pub fn has_links(&self) -> bool {
        self.low.is_some() || self.high.is_some()
    }

    /// Label → download URL for every link found, each with `&dl=1` appended.
    pub fn download_links(&self) -> BTreeMap<String, String> {
        Quality::ALL
            .into_iter()
            .filter_map(|q| {
                self.link(q)
                    .map(|url| (q.label().to_string(), format!("{url}{DOWNLOAD_SUFFIX}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_inner_text_of_first_element() {
        let html = "<html><head><title>Funny cat | Video</title></head><title>second</title>";
        assert_eq!(extract_title(html), "Funny cat | Video");
    }

    #[test]
    fn missing_title_yields_sentinel() {
        assert_eq!(extract_title("<html><head></head></html>"), NO_TITLE);
        assert_eq!(extract_title(""), "No Title");
    }

    #[test]
    fn title_match_is_case_sensitive_and_single_line() {
        assert_eq!(extract_title("<TITLE>shouting</TITLE>"), NO_TITLE);
        assert_eq!(extract_title("<title>two\nlines</title>"), NO_TITLE);
    }

    #[test]
    fn empty_title_element_is_kept_as_empty() {
        assert_eq!(extract_title("<title></title>"), "");
    }

    #[test]
    fn id_is_trailing_digit_run() {
        assert_eq!(
            extract_video_id("https://www.facebook.com/watch/1234567890"),
            "1234567890"
        );
        assert_eq!(
            extract_video_id("https://www.facebook.com/user/videos/987654321/"),
            "987654321"
        );
    }

    #[test]
    fn id_is_empty_without_trailing_digits() {
        assert_eq!(extract_video_id("https://www.facebook.com/watch/?v=123x"), "");
        assert_eq!(extract_video_id("https://fb.watch/abc/"), "");
        assert_eq!(extract_video_id("https://example.com/123//"), "");
    }

    #[test]
    fn id_uses_only_the_final_segment() {
        assert_eq!(extract_video_id("https://example.com/12/34"), "34");
        assert_eq!(extract_video_id("https://example.com/watch/?v=55"), "55");
    }

    #[test]
    fn sd_link_is_unescaped() {
        let html = r#"..."browser_native_sd_url":"https:\/\/example.com\/v.mp4","other":1"#;
        assert_eq!(extract_sd_link(html), "https://example.com/v.mp4");
    }

    #[test]
    fn percent_escape_is_restored() {
        let html = r#""browser_native_hd_url":"https:\/\/cdn.example\/v.mp4?_nc=a\u00253Db&oh=1""#;
        assert_eq!(
            extract_hd_link(html),
            "https://cdn.example/v.mp4?_nc=a%3Db&oh=1"
        );
    }

    #[test]
    fn other_escapes_are_left_alone() {
        let html = r#""browser_native_sd_url":"https:\/\/x\/v.mp4?q=\u0026""#;
        assert_eq!(extract_sd_link(html), r"https://x/v.mp4?q=\u0026");
    }

    #[test]
    fn missing_keys_yield_empty_links() {
        let html = "<title>t</title><script>{\"playable_url\":\"x\"}</script>";
        assert_eq!(extract_sd_link(html), "");
        assert_eq!(extract_hd_link(html), "");
    }

    #[test]
    fn sd_and_hd_are_independent() {
        let html = r#""browser_native_hd_url":"https://h""#;
        assert_eq!(extract_sd_link(html), "");
        assert_eq!(extract_hd_link(html), "https://h");
    }

    #[test]
    fn first_occurrence_wins() {
        let html = r#""browser_native_sd_url":"https://first" "browser_native_sd_url":"https://second""#;
        assert_eq!(extract_sd_link(html), "https://first");
    }

    #[test]
    fn record_builds_labelled_download_links() {
        let html = r#"<title>T</title>"browser_native_sd_url":"https://s?a=1","browser_native_hd_url":"https://h?a=2""#;
        let record = ExtractedRecord::from_page("https://example.com/v/77", html);

        let links = record.download_links();
        assert_eq!(links.len(), 2);
        assert_eq!(links["Download Low Quality(360p)"], "https://s?a=1&dl=1");
        assert_eq!(links["Download High Quality(720p)"], "https://h?a=2&dl=1");
        assert!(record.has_links());
    }

    #[test]
    fn record_without_links_has_empty_map() {
        let record = ExtractedRecord::from_page("https://example.com/v/", "<p>nothing</p>");
        assert_eq!(record.id, "");
        assert_eq!(record.title, NO_TITLE);
        assert!(!record.has_links());
        assert!(record.download_links().is_empty());
    }
}
