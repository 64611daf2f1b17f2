use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use stelle_config::StelleConfig;
use stelle_http::RequestOpts;
use stelle_scraper::{BrowserFetcher, ExtractedRecord, Quality, scrape};
use stelle_server::DownloadResponse;
use tokio_util::sync::CancellationToken;

pub async fn serve(mut cfg: StelleConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        cfg.server.host = host;
    }
    if let Some(port) = port {
        cfg.server.port = port;
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    tracing::info!("Starting video link extraction server...");
    stelle_server::serve(&cfg, shutdown).await
}

/// Cancel `token` on Ctrl-C, or SIGTERM on unix.
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
    token.cancel();
}

pub async fn extract(cfg: &StelleConfig, url: &str) -> Result<()> {
    let record = fetch_record(cfg, url).await?;
    let body = serde_json::to_string_pretty(&DownloadResponse::from_record(&record))?;
    println!("{body}");
    Ok(())
}

pub async fn download(
    cfg: &StelleConfig,
    url: &str,
    preferred: Quality,
    output: Option<PathBuf>,
) -> Result<()> {
    let record = fetch_record(cfg, url).await?;

    let Some(quality) = pick_quality(&record, preferred) else {
        bail!("no download links could be extracted from {url}");
    };
    if quality != preferred {
        tracing::warn!(
            wanted = preferred.label(),
            using = quality.label(),
            "preferred quality unavailable, falling back"
        );
    }

    let links = record.download_links();
    let link = links
        .get(quality.label())
        .context("selected quality has no link")?;
    let dest = output.unwrap_or_else(|| default_output(quality));

    eprintln!("Downloading {}...", quality.label());
    eprintln!("Saving to: {}", dest.display());

    let fetcher = BrowserFetcher::from_config(&cfg.fetch)?;
    let opts = RequestOpts {
        headers: Some(fetcher.headers().clone()),
        ..Default::default()
    };
    let bytes = fetcher
        .http()
        .download_to(link, &dest, opts)
        .await
        .with_context(|| format!("download of {} failed", quality.label()))?;

    eprintln!("Download finished: {} ({bytes} bytes)", dest.display());
    Ok(())
}

async fn fetch_record(cfg: &StelleConfig, url: &str) -> Result<ExtractedRecord> {
    if url.is_empty() {
        bail!("Please provide the URL");
    }
    let fetcher = BrowserFetcher::from_config(&cfg.fetch)?;
    scrape(&fetcher, url)
        .await
        .with_context(|| format!("failed to fetch {url}"))
}

/// `preferred` when the page offers it, otherwise whichever link exists.
fn pick_quality(record: &ExtractedRecord, preferred: Quality) -> Option<Quality> {
    std::iter::once(preferred)
        .chain(Quality::ALL.into_iter().filter(|q| *q != preferred))
        .find(|q| record.link(*q).is_some())
}

fn default_output(quality: Quality) -> PathBuf {
    PathBuf::from(format!("video_{}.mp4", slug(quality.label())))
}

fn slug(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
