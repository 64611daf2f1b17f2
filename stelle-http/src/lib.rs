//! Minimal HTTP client for page scraping and file downloads, with safe logging.
//!
//! - [`HttpClient::get_text`]: one GET, body read fully into a `String`
//! - [`HttpClient::download_to`]: one GET, body streamed chunk by chunk to disk
//! - Per-request headers and timeout via [`RequestOpts`]
//! - No retries: every call issues exactly one request
//! - Optional *raw* request/response logging via `STELLE_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), stelle_http::HttpError> {
//! let client = stelle_http::HttpClient::new()?;
//! let html = client
//!     .get_text("https://www.example.com/", stelle_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), final errors, and
//! (optionally) raw request/response lines (target `http.raw`). Cookie and
//! authorization headers are always redacted.

use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Url};
use std::env;
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

pub use reqwest::StatusCode;
pub use reqwest::header;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "STELLE_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)
const SNIPPET_MAX: usize = 500;

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_sensitive_header(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "authorization" | "cookie" | "set-cookie" | "proxy-authorization"
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if is_sensitive_header(&key) {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    /// Connection-level failure; the underlying message is kept verbatim.
    #[error("{0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The upstream answered, but not with the status we accept. The code is
    /// kept for logging and callers that branch on it, not for the message.
    #[error("failed to fetch page")]
    Status { status: StatusCode },
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl HttpError {
    fn from_send(err: reqwest::Error, timeout: Option<Duration>) -> Self {
        match timeout {
            Some(t) if err.is_timeout() => HttpError::Timeout(t),
            _ => HttpError::Network(err.to_string()),
        }
    }
}

// ==============================
// Request Options
// ==============================

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use stelle_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(opts.headers.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    pub timeout: Option<Duration>,
    pub headers: Option<HeaderMap>,
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    pub default_timeout: Duration,
    pub connect_timeout: Duration,
}

impl HttpClient {
    /// Construct a client with a 15s request timeout and a 5s connect timeout.
    ///
    /// ```no_run
    /// use stelle_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new()?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.connect_timeout, Duration::from_secs(5));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new() -> Result<Self, HttpError> {
        let connect_timeout = Duration::from_secs(5);
        Ok(Self {
            inner: build_inner(connect_timeout)?,
            default_timeout: Duration::from_secs(15),
            connect_timeout,
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    ///
    /// ```no_run
    /// use stelle_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new()?.with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Rebuild the underlying connection pool with a different connect timeout.
    pub fn with_connect_timeout(mut self, dur: Duration) -> Result<Self, HttpError> {
        self.inner = build_inner(dur)?;
        self.connect_timeout = dur;
        Ok(self)
    }

    /// GET `url` and return the body as text.
    ///
    /// Only `200 OK` counts as success; any other status becomes
    /// [`HttpError::Status`], whose message does not carry the code.
    pub async fn get_text(&self, url: &str, opts: RequestOpts) -> Result<String, HttpError> {
        let url = Url::parse(url).map_err(|e| HttpError::Url(e.to_string()))?;
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let req_id = new_req_id();

        let resp = self
            .send(&req_id, Method::GET, &url, opts.headers.as_ref(), Some(timeout))
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            tracing::warn!(req_id=%req_id, %status, "http.error");
            return Err(HttpError::Status { status });
        }

        let headers = resp.headers().clone();
        let t0 = Instant::now();
        let body = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout(timeout)
            } else {
                HttpError::Body(e.to_string())
            }
        })?;

        tracing::debug!(
            req_id=%req_id,
            %status,
            body_read_ms=t0.elapsed().as_millis() as u64,
            body_len=body.len(),
            "http.response.body"
        );
        log_raw_response(&req_id, status, &headers, body.as_bytes());
        tracing::trace!(req_id=%req_id, body_snippet=%snip_body(body.as_bytes()), "http.response.body_snippet");

        Ok(body)
    }

    /// GET `url` and stream the body into `dest`, returning the bytes written.
    ///
    /// Any 2xx status is accepted. No timeout is applied unless `opts.timeout`
    /// is set, since a large file may legitimately take longer than a page.
    pub async fn download_to(
        &self,
        url: &str,
        dest: &Path,
        opts: RequestOpts,
    ) -> Result<u64, HttpError> {
        let url = Url::parse(url).map_err(|e| HttpError::Url(e.to_string()))?;
        let req_id = new_req_id();

        let resp = self
            .send(&req_id, Method::GET, &url, opts.headers.as_ref(), opts.timeout)
            .await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(req_id=%req_id, %status, "http.error");
            return Err(HttpError::Status { status });
        }

        let written = match stream_to_file(resp, dest, opts.timeout).await {
            Ok(n) => n,
            Err(err) => {
                // A partial file must not be mistaken for a finished download.
                let _ = tokio::fs::remove_file(dest).await;
                tracing::warn!(req_id=%req_id, message=%err, dest=%dest.display(), "http.download.aborted");
                return Err(err);
            }
        };

        tracing::info!(
            req_id=%req_id,
            bytes=written,
            dest=%dest.display(),
            "http.download.complete"
        );
        Ok(written)
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn send(
        &self,
        req_id: &str,
        method: Method,
        url: &Url,
        headers: Option<&HeaderMap>,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, HttpError> {
        let mut rb = self.inner.request(method.clone(), url.clone());
        if let Some(t) = timeout {
            rb = rb.timeout(t);
        }
        if let Some(h) = headers {
            rb = rb.headers(h.clone());
        }

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            timeout_ms=timeout.map(|t| t.as_millis() as u64),
            "http.request.start"
        );

        if raw_enabled() {
            let empty = HeaderMap::new();
            let curl = make_curl(&method, url, headers.unwrap_or(&empty));
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let t0 = Instant::now();
        let resp = rb.send().await.map_err(|err| {
            let err = HttpError::from_send(err, timeout);
            tracing::warn!(req_id=%req_id, message=%err, "http.network_error.send");
            err
        })?;

        tracing::debug!(
            req_id=%req_id,
            status=%resp.status(),
            duration_ms=t0.elapsed().as_millis() as u64,
            content_length=?resp.content_length(),
            "http.response.headers"
        );
        Ok(resp)
    }
}

// ==============================
// Helpers
// ==============================

fn build_inner(connect_timeout: Duration) -> Result<Client, HttpError> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| HttpError::Build(e.to_string()))
}

async fn stream_to_file(
    resp: reqwest::Response,
    dest: &Path,
    timeout: Option<Duration>,
) -> Result<u64, HttpError> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut written: u64 = 0;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| match timeout {
            Some(t) if e.is_timeout() => HttpError::Timeout(t),
            _ => HttpError::Body(e.to_string()),
        })?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

fn new_req_id() -> String {
    format!("r{}", Uuid::new_v4().simple())
}

fn log_raw_response(req_id: &str, status: StatusCode, headers: &HeaderMap, body: &[u8]) {
    if !raw_enabled() {
        return;
    }
    let hdrs = redact_headers(headers);
    let truncated = body.len() > RAW_MAX_BODY;
    let text = String::from_utf8_lossy(&body[..body.len().min(RAW_MAX_BODY)]);
    tracing::info!(
        target: "http.raw",
        %req_id,
        status=%status,
        headers=?hdrs,
        body=%text,
        truncated
    );
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(&body[..body.len().min(SNIPPET_MAX)]).to_string();
    if body.len() > SNIPPET_MAX {
        snip.push_str("...");
    }
    snip
}
