//! One-time corpus ingestion.
//!
//! Idempotent across startups: the store's completion marker gates the
//! whole build. A non-empty store without the marker means a previous run
//! died between batches; it is cleared and rebuilt rather than served torn.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use versed_core::chunker::{chunk, ChunkerConfig};
use versed_core::document::Document;
use versed_core::error::{Error, Result};
use versed_core::traits::{Embedder, VectorIndex};
use versed_core::types::IndexEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks: usize,
    pub batches: usize,
    pub skipped: bool,
}

/// Build the index if it has not been built yet. Safe to call every startup.
///
/// Chunk texts are embedded in sub-batches of `embedder.max_batch()`, then
/// the entries are inserted in consecutive groups of at most
/// `store.max_batch_size()`, in chunk order — `ceil(N/B)` insert calls, so a
/// request larger than the store's ceiling is never submitted whole.
pub async fn ingest(
    document: &Document,
    config: &ChunkerConfig,
    embedder: &dyn Embedder,
    store: &dyn VectorIndex,
) -> Result<IngestReport> {
    if store.is_complete().await? {
        info!("index already built, skipping ingestion");
        return Ok(IngestReport { chunks: 0, batches: 0, skipped: true });
    }
    if embedder.dim() != store.dim() {
        return Err(Error::DimensionMismatch { got: embedder.dim(), want: store.dim() });
    }
    if !store.is_empty().await? {
        warn!("found a partially built index from an interrupted run, rebuilding");
        store.clear().await?;
    }

    let chunks = chunk(document, config)?;
    if chunks.is_empty() {
        info!(document = %document.name, "document produced no chunks");
        store.mark_complete().await?;
        return Ok(IngestReport { chunks: 0, batches: 0, skipped: false });
    }

    info!(chunks = chunks.len(), document = %document.name, "embedding corpus");
    let pb = ProgressBar::new(chunks.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut entries = Vec::with_capacity(chunks.len());
    for group in chunks.chunks(embedder.max_batch()) {
        let texts: Vec<String> = group.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != group.len() {
            return Err(Error::Provider(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                group.len()
            )));
        }
        for (c, vector) in group.iter().zip(vectors) {
            entries.push(IndexEntry { chunk: c.clone(), vector });
            pb.inc(1);
        }
    }
    pb.finish_and_clear();

    let mut batches = 0usize;
    for group in entries.chunks(store.max_batch_size()) {
        store.insert_batch(group).await?;
        batches += 1;
    }
    store.mark_complete().await?;
    info!(chunks = entries.len(), batches, "ingestion complete");
    Ok(IngestReport { chunks: entries.len(), batches, skipped: false })
}
