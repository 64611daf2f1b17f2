use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use stelle_scraper::Quality;

#[derive(Debug, Parser)]
#[command(name = "stelle", version, about = "Extract direct video links from public video pages")]
pub struct Cli {
    /// Configuration file (defaults to ./stelle.yaml when present)
    #[arg(long, global = true, env = "STELLE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP endpoint
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Fetch a page and print the extracted links as JSON
    Extract { url: String },
    /// Fetch a page and save one of its videos to disk
    Download {
        url: String,
        #[arg(long, value_enum, default_value_t = QualityArg::High)]
        quality: QualityArg,
        /// Destination file (defaults to video_<quality>.mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QualityArg {
    Low,
    High,
}

impl From<QualityArg> for Quality {
    fn from(q: QualityArg) -> Self {
        match q {
            QualityArg::Low => Quality::Low,
            QualityArg::High => Quality::High,
        }
    }
}
