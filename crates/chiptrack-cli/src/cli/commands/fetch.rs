//! `chiptrack fetch` – download one URL with parallel range requests.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use chiptrack_core::config::ChiptrackConfig;
use chiptrack_core::downloader::ChunkedDownloader;
use chiptrack_core::segmenter;

pub async fn run_fetch(cfg: &ChiptrackConfig, url: &str, output: &Path) -> Result<()> {
    let downloader = ChunkedDownloader::new(crate::cli::transport(cfg));
    let workers = cfg.workers;
    let deadline = Instant::now() + cfg.request_timeout();
    let started = Instant::now();

    let owned_url = url.to_string();
    let (target, bytes) = tokio::task::spawn_blocking(move || {
        let target = downloader.probe(&owned_url, Some(deadline))?;
        let bytes = downloader.download(&target, workers, Some(deadline))?;
        Ok::<_, chiptrack_core::downloader::DownloadError>((target, bytes))
    })
    .await
    .context("download task join")?
    .with_context(|| format!("failed to download {url}"))?;

    std::fs::write(output, &bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let chunks = match target.total_length {
        Some(len) if target.supports_range => segmenter::plan_chunks(len, workers).len(),
        _ => 1,
    };
    let secs = started.elapsed().as_secs_f64();
    let rate_mib = if secs > 0.0 {
        bytes.len() as f64 / secs / 1_048_576.0
    } else {
        0.0
    };
    println!(
        "{} bytes -> {} ({} request(s), {:.2}s, {:.2} MiB/s)",
        bytes.len(),
        output.display(),
        chunks,
        secs,
        rate_mib
    );
    Ok(())
}
