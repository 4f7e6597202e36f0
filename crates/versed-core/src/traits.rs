//! Capability traits at the pipeline seams.
//!
//! Concrete providers (HTTP embedding/generation services, the LanceDB
//! store) live in their own crates; the pipeline in `versed-rag` only sees
//! these interfaces, so tests can substitute deterministic fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{IndexEntry, ScoredChunk};

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `ollama:mxbai-embed-large:d1024`).
    fn id(&self) -> &str;
    /// Embedding dimensionality. Every returned vector has this length.
    fn dim(&self) -> usize;
    /// Maximum number of texts accepted by a single `embed` call.
    /// Callers split larger inputs; oversized calls fail with `ProviderLimit`.
    fn max_batch(&self) -> usize;
    /// Embed a batch of texts, one vector per input in the same order.
    /// Zero texts is `EmptyInput`.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn id(&self) -> &str;
    /// Single non-streaming completion for a fully assembled prompt.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Persistent vector index over `IndexEntry` records.
///
/// Writes happen once, during ingestion, strictly before any query is
/// served; implementations need not support interleaved writes and reads.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Dimensionality the store was opened with.
    fn dim(&self) -> usize;
    /// Ceiling on entries per `insert_batch` call.
    fn max_batch_size(&self) -> usize;

    /// True iff no entry has ever been inserted.
    async fn is_empty(&self) -> Result<bool>;
    /// True iff a past ingestion ran to completion (`mark_complete` was
    /// reached). A non-empty store without this flag is a torn index.
    async fn is_complete(&self) -> Result<bool>;

    /// Insert all entries, or fail without inserting any of them.
    /// Oversized batches are rejected with `BatchTooLarge`, never split.
    async fn insert_batch(&self, entries: &[IndexEntry]) -> Result<()>;
    /// Record that ingestion finished; gates future re-ingestion.
    async fn mark_complete(&self) -> Result<()>;
    /// Drop all entries and the completion flag.
    async fn clear(&self) -> Result<()>;

    /// Top-`k` entries by descending similarity to `vector`. Returns fewer
    /// than `k` when the store holds fewer entries.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;
}
