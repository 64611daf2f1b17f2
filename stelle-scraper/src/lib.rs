//! Video page scraping: one fetch, four pattern extractions.
//!
//! [`fetch`] retrieves the page HTML the way a desktop browser would ask for
//! it; [`extract`] pulls the title, the numeric id and the SD/HD video links
//! out of the raw text. [`scrape`] chains the two.
pub mod extract;
pub mod fetch;

pub use extract::{ExtractedRecord, NO_TITLE, Quality};
pub use fetch::{BrowserFetcher, PageFetcher, browser_headers};
pub use stelle_http::HttpError;

/// Fetch `url` and run every extraction over the returned page.
pub async fn scrape(fetcher: &dyn PageFetcher, url: &str) -> Result<ExtractedRecord, HttpError> {
    let html = fetcher.fetch(url).await?;
    tracing::debug!(html_len = html.len(), "scrape.fetched");
    Ok(ExtractedRecord::from_page(url, &html))
}
