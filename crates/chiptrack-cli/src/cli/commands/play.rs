//! `chiptrack play` – download tracks page by page and play each to completion.

use std::sync::Arc;

use anyhow::{Context, Result};
use chiptrack_core::catalog::{Catalog, TrackFilter, UrlListCatalog};
use chiptrack_core::config::ChiptrackConfig;
use chiptrack_core::player::{AudioOutput, CpalOutput, NullOutput, PlaybackController};
use chiptrack_core::track::TrackFetcher;
use tokio::sync::watch;

use crate::cli::controls;

/// URLs per catalog page.
const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct PlayOptions {
    pub urls: Vec<String>,
    pub search: String,
    pub filter: TrackFilter,
    pub no_audio: bool,
    pub loop_tracks: bool,
}

pub async fn run_play(cfg: &ChiptrackConfig, opts: PlayOptions) -> Result<()> {
    let output: Arc<dyn AudioOutput> = if opts.no_audio {
        Arc::new(NullOutput::paced())
    } else {
        Arc::new(CpalOutput::new(cfg.output_device.clone()))
    };
    let player = Arc::new(PlaybackController::new(output).with_buffer(cfg.buffer())?);
    let fetcher = Arc::new(TrackFetcher::new(
        crate::cli::transport(cfg),
        cfg.workers,
        cfg.request_timeout(),
    ));
    let catalog = UrlListCatalog::new(opts.urls.clone(), PAGE_SIZE);

    let (quit_tx, quit_rx) = watch::channel(false);
    controls::spawn_stdin_reader(Arc::clone(&player), quit_tx)
        .context("failed to start stdin controls")?;

    let result = play_pages(&catalog, &fetcher, &player, &opts, quit_rx).await;
    player.close();
    result
}

async fn play_pages(
    catalog: &dyn Catalog,
    fetcher: &Arc<TrackFetcher>,
    player: &Arc<PlaybackController>,
    opts: &PlayOptions,
    mut quit_rx: watch::Receiver<bool>,
) -> Result<()> {
    let mut page = 1;
    let mut played = 0usize;
    loop {
        let urls = catalog.search(&opts.search, opts.filter, page)?;
        if urls.is_empty() {
            if played == 0 {
                println!("No tracks matched {:?}", opts.search);
            }
            return Ok(());
        }

        for url in urls {
            if *quit_rx.borrow() {
                return Ok(());
            }
            let metadata = catalog.track_metadata(&url)?;
            let track = {
                let fetcher = Arc::clone(fetcher);
                let url = url.clone();
                tokio::task::spawn_blocking(move || fetcher.get_track(&url, metadata))
                    .await
                    .context("download task join")??
            };

            let (title, artist) = (track.title.clone(), track.artist.clone());
            let done = {
                let player = Arc::clone(player);
                tokio::task::spawn_blocking(move || player.play(Some(track)))
                    .await
                    .context("play task join")?
                    .with_context(|| format!("failed to play {url}"))?
            };
            if opts.loop_tracks {
                player.toggle_loop();
            }
            println!("Now playing: {} by {}", title, artist);
            played += 1;

            tokio::select! {
                outcome = done.wait() => {
                    tracing::debug!(?outcome, title = %title, "track ended");
                }
                Ok(()) = quit_rx.changed() => {
                    return Ok(());
                }
            }
        }
        page += 1;
    }
}
