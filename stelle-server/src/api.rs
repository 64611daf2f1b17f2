use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, Method, header};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use stelle_config::StatusPolicy;
use stelle_scraper::{PageFetcher, Quality, scrape};
use tower_http::LatencyUnit;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Instrument, Level};
use uuid::Uuid;

use crate::response::{ApiError, DownloadRequest, DownloadResponse};

pub const DOWNLOAD_PATH: &str = "/api/download";

#[derive(Clone)]
pub struct AppState {
    fetcher: Arc<dyn PageFetcher>,
    status_policy: StatusPolicy,
}

impl AppState {
    pub fn new(fetcher: Arc<dyn PageFetcher>, status_policy: StatusPolicy) -> Self {
        Self {
            fetcher,
            status_policy,
        }
    }
}

/// Build the application router with CORS and request logging layers.
///
/// `allowed_origins` containing `"*"` allows any origin; otherwise only the
/// listed origins receive `Access-Control-Allow-Origin`.
pub fn router(state: AppState, allowed_origins: &[String]) -> anyhow::Result<Router> {
    Ok(Router::new()
        .route(DOWNLOAD_PATH, post(download))
        .with_state(state)
        .layer(cors_layer(allowed_origins)?)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        ))
}

fn cors_layer(allowed_origins: &[String]) -> anyhow::Result<CorsLayer> {
    let allow_origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins = allowed_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o)
                    .map_err(|e| anyhow::anyhow!("invalid CORS origin {o:?}: {e}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]))
}

// The body is decoded as JSON whatever its content type.
async fn download(State(state): State<AppState>, body: Bytes) -> Response {
    let req_id = Uuid::new_v4();
    let policy = state.status_policy;
    let span = tracing::info_span!("download", %req_id);

    async move {
        match handle_download(&state, &body).await {
            Ok(resp) => {
                tracing::info!("request completed successfully");
                resp.into_http(axum::http::StatusCode::OK, policy)
            }
            Err(err) => {
                tracing::warn!(error = %err, "request failed");
                err.into_http(policy)
            }
        }
    }
    .instrument(span)
    .await
}

async fn handle_download(state: &AppState, body: &[u8]) -> Result<DownloadResponse, ApiError> {
    let req: DownloadRequest =
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    tracing::info!(url = %req.url, "received download request");

    if req.url.is_empty() {
        return Err(ApiError::EmptyUrl);
    }

    let record = scrape(state.fetcher.as_ref(), &req.url).await?;
    tracing::info!(id = %record.id, title = %record.title, "extracted page metadata");

    for quality in Quality::ALL {
        match record.link(quality) {
            Some(link) => tracing::info!(label = quality.label(), %link, "found link"),
            None => tracing::info!(label = quality.label(), "link not found"),
        }
    }
    if !record.has_links() {
        tracing::warn!("no download links found");
    }

    Ok(DownloadResponse::from_record(&record))
}
