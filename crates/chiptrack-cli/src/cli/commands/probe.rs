//! `chiptrack probe` – show HEAD metadata and the planned chunk split.

use std::time::Instant;

use anyhow::{Context, Result};
use chiptrack_core::config::ChiptrackConfig;
use chiptrack_core::fetch_head::{self, HeadResult};
use chiptrack_core::segmenter;
use chiptrack_core::track::AudioFileType;

pub async fn run_probe(cfg: &ChiptrackConfig, url: &str) -> Result<()> {
    let transport = crate::cli::transport(cfg);
    let deadline = Instant::now() + cfg.request_timeout();
    let owned_url = url.to_string();
    let head = tokio::task::spawn_blocking(move || {
        fetch_head::probe(transport.as_ref(), &owned_url, Some(deadline))
    })
    .await
    .context("probe task join")?
    .with_context(|| format!("HEAD {url} failed"))?;

    print!("{}", describe_probe(url, &head, cfg.workers));
    Ok(())
}

pub(crate) fn describe_probe(url: &str, head: &HeadResult, workers: usize) -> String {
    let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let file_type = AudioFileType::classify(url, head.content_type.as_deref());
    let mut out = String::new();
    out.push_str(&format!("url:            {url}\n"));
    out.push_str(&format!(
        "content-length: {}\n",
        head.content_length
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string())
    ));
    out.push_str(&format!("accept-ranges:  {}\n", if head.accept_ranges { "bytes" } else { "none" }));
    out.push_str(&format!("content-type:   {}\n", opt(&head.content_type)));
    out.push_str(&format!("etag:           {}\n", opt(&head.etag)));
    out.push_str(&format!("last-modified:  {}\n", opt(&head.last_modified)));
    out.push_str(&format!("file type:      {file_type}\n"));
    match head.content_length {
        Some(len) if head.accept_ranges => {
            let chunks = segmenter::plan_chunks(len, workers);
            out.push_str(&format!(
                "plan:           {} range request(s), {} bytes each\n",
                chunks.len(),
                segmenter::nominal_chunk_size(len, workers)
            ));
        }
        _ => out.push_str("plan:           single GET\n"),
    }
    out
}
