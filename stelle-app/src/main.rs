use anyhow::Result;
use clap::Parser;
use stelle_common::observability::{LogConfig, init_logging};
use stelle_config::{StelleConfig, StelleConfigLoader};

use cli::{Cli, Command};

mod cli;
mod commands;

const DEFAULT_CONFIG_FILE: &str = "stelle.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins over file)
    let cfg = load_config(&cli)?;

    // 2) Logging, before anything else can emit events
    let log_path = init_logging(LogConfig {
        app_name: "stelle",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    })?;
    tracing::debug!(log_path = %log_path.display(), "logger initialised");

    match cli.command {
        Command::Serve { host, port } => commands::serve(cfg, host, port).await,
        Command::Extract { url } => commands::extract(&cfg, &url).await,
        Command::Download {
            url,
            quality,
            output,
        } => commands::download(&cfg, &url, quality.into(), output).await,
    }
}

fn load_config(cli: &Cli) -> Result<StelleConfig> {
    let loader = match &cli.config {
        Some(path) => StelleConfigLoader::new().with_file(path),
        None => StelleConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    Ok(loader.load()?)
}
