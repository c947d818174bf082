//! CLI for the chiptrack player.

mod commands;
mod controls;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use chiptrack_core::catalog::{TrackFilter, UrlListCatalog};
use chiptrack_core::config::{self, ChiptrackConfig};
use chiptrack_core::fetch::{CurlOptions, CurlTransport, HttpTransport};

use commands::{run_devices, run_fetch, run_play, run_probe, PlayOptions};

/// Top-level CLI for the chiptrack player.
#[derive(Debug, Parser)]
#[command(name = "chiptrack")]
#[command(about = "chiptrack: download chip music with parallel range requests and play it", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download and play tracks one after another.
    ///
    /// While a track plays, type pause, stop, loop, skip, status or quit and press Enter.
    Play {
        /// Direct download URLs of the tracks.
        #[arg(required = true)]
        urls: Vec<String>,
        /// Only play URLs containing this text (case-insensitive).
        #[arg(long, default_value = "")]
        search: String,
        /// Play order: latest (last URL first) or random. Unknown values mean random.
        #[arg(long, default_value = "random")]
        filter: String,
        /// Concurrent range requests per track (overrides config).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
        /// Play without an audio device (playback still advances in real time).
        #[arg(long)]
        no_audio: bool,
        /// Output device name substring (overrides config).
        #[arg(long, value_name = "NAME")]
        device: Option<String>,
        /// Loop each track until skipped or stopped with quit.
        #[arg(long = "loop")]
        loop_tracks: bool,
    },

    /// Download a URL with parallel range requests and write it to a file.
    Fetch {
        /// Direct HTTP/HTTPS URL to download.
        url: String,
        /// Destination file.
        #[arg(long, short, value_name = "PATH")]
        output: PathBuf,
        /// Concurrent range requests (overrides config).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
    },

    /// Show what a HEAD request reports for a URL and how it would be split.
    Probe {
        /// Direct HTTP/HTTPS URL to probe.
        url: String,
    },

    /// List audio output devices.
    Devices,
}

/// Config with command-line overrides applied and validated.
fn effective_config(
    mut cfg: ChiptrackConfig,
    workers: Option<usize>,
    device: Option<String>,
) -> Result<ChiptrackConfig> {
    if let Some(workers) = workers {
        cfg.workers = workers;
    }
    if device.is_some() {
        cfg.output_device = device;
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Play order for URLs given on the command line.
fn list_filter(name: &str) -> Result<TrackFilter> {
    let filter = TrackFilter::parse_lenient(name);
    if !UrlListCatalog::supports(filter) {
        anyhow::bail!("--filter {filter} needs a remote catalog; use latest or random");
    }
    Ok(filter)
}

fn transport(cfg: &ChiptrackConfig) -> Arc<dyn HttpTransport> {
    Arc::new(CurlTransport::new(CurlOptions {
        connect_timeout: cfg.connect_timeout(),
        ..CurlOptions::default()
    }))
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Play {
                urls,
                search,
                filter,
                workers,
                no_audio,
                device,
                loop_tracks,
            } => {
                let cfg = effective_config(cfg, workers, device)?;
                let opts = PlayOptions {
                    urls,
                    search,
                    filter: list_filter(&filter)?,
                    no_audio,
                    loop_tracks,
                };
                run_play(&cfg, opts).await?
            }
            CliCommand::Fetch {
                url,
                output,
                workers,
            } => {
                let cfg = effective_config(cfg, workers, None)?;
                run_fetch(&cfg, &url, &output).await?
            }
            CliCommand::Probe { url } => run_probe(&cfg, &url).await?,
            CliCommand::Devices => run_devices()?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
