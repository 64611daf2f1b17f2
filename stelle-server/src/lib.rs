//! HTTP surface: `POST /api/download` and its CORS preflight.
//!
//! Every request runs Fetch → Extract → Respond with no state kept between
//! calls. The handler future owns the outbound fetch, so when a client goes
//! away and the connection task drops the handler, the fetch is dropped too.
use anyhow::Context;
use std::sync::Arc;
use stelle_config::StelleConfig;
use stelle_scraper::BrowserFetcher;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub mod api;
pub mod response;

pub use api::{AppState, DOWNLOAD_PATH, router};
pub use response::{ApiError, DownloadRequest, DownloadResponse};

/// Bind the configured address and serve until `shutdown` is cancelled.
pub async fn serve(cfg: &StelleConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let fetcher = BrowserFetcher::from_config(&cfg.fetch).context("failed to build page fetcher")?;
    let state = AppState::new(Arc::new(fetcher), cfg.server.status_policy);
    let app = router(state, &cfg.server.allowed_origins)?;

    let addr = cfg.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    serve_on(listener, app, shutdown).await
}

/// Serve `app` on an already bound listener. Tests bind port 0 and use this.
pub async fn serve_on(
    listener: TcpListener,
    app: axum::Router,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, "Server running at http://{local}");
    tracing::info!("API endpoint available at http://{local}{DOWNLOAD_PATH}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("server terminated with an error")?;

    tracing::info!("server stopped");
    Ok(())
}
