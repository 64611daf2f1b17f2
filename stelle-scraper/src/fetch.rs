//! Page retrieval with fixed browser-like headers.

use async_trait::async_trait;
use stelle_config::FetchConfig;
use stelle_http::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use stelle_http::{HttpClient, HttpError, RequestOpts};

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_EN: &str = "en-US,en;q=0.9";

/// Source of page HTML. The server holds one behind an `Arc` so tests can
/// swap in a canned page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Return the full body of `url`, or why it could not be retrieved.
    async fn fetch(&self, url: &str) -> Result<String, HttpError>;
}

/// Headers a desktop browser would send for a page navigation.
///
/// ```
/// use stelle_scraper::browser_headers;
///
/// let headers = browser_headers("Mozilla/5.0 (Windows NT 10.0; Win64; x64)").unwrap();
/// assert_eq!(headers["accept-language"], "en-US,en;q=0.9");
/// assert!(headers["accept"].to_str().unwrap().starts_with("text/html"));
/// ```
pub fn browser_headers(user_agent: &str) -> Result<HeaderMap, HttpError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|e| HttpError::Build(format!("invalid user agent: {e}")))?,
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_EN));
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    Ok(headers)
}

/// [`PageFetcher`] backed by [`HttpClient`]: one GET, no retries.
#[derive(Clone)]
pub struct BrowserFetcher {
    http: HttpClient,
    headers: HeaderMap,
}

impl BrowserFetcher {
    pub fn new(http: HttpClient, user_agent: &str) -> Result<Self, HttpError> {
        Ok(Self {
            http,
            headers: browser_headers(user_agent)?,
        })
    }

    /// Build the client and headers from the `fetch` section of the config.
    pub fn from_config(cfg: &FetchConfig) -> Result<Self, HttpError> {
        let http = HttpClient::new()?
            .with_timeout(cfg.timeout())
            .with_connect_timeout(cfg.connect_timeout())?;
        Self::new(http, &cfg.user_agent)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, HttpError> {
        let opts = RequestOpts {
            headers: Some(self.headers.clone()),
            ..Default::default()
        };
        self.http.get_text(url, opts).await
    }
}
