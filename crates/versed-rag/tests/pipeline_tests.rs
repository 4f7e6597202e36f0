use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use versed_core::chunker::ChunkerConfig;
use versed_core::document::Document;
use versed_core::error::{Error, Result};
use versed_core::traits::{Embedder, LanguageModel, VectorIndex};
use versed_core::types::{IndexEntry, ScoredChunk};
use versed_embed::HashEmbedder;
use versed_rag::{cited_indices, generate, ingest, retrieve};
use versed_vector::VectorStore;

const GENESIS: &str = "In the beginning God created the heaven and the earth.";

/// In-memory store that records every insert call, for asserting the
/// batching contract without touching disk.
struct RecordingStore {
    dim: usize,
    max_batch: usize,
    entries: Mutex<Vec<IndexEntry>>,
    batch_sizes: Mutex<Vec<usize>>,
    complete: Mutex<bool>,
    cleared: Mutex<usize>,
}

impl RecordingStore {
    fn new(dim: usize, max_batch: usize) -> Self {
        Self {
            dim,
            max_batch,
            entries: Mutex::new(Vec::new()),
            batch_sizes: Mutex::new(Vec::new()),
            complete: Mutex::new(false),
            cleared: Mutex::new(0),
        }
    }

    fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().expect("lock").clone()
    }

    fn entry_ids(&self) -> Vec<String> {
        self.entries.lock().expect("lock").iter().map(|e| e.chunk.id.clone()).collect()
    }
}

#[async_trait]
impl VectorIndex for RecordingStore {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch
    }

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.entries.lock().expect("lock").is_empty())
    }

    async fn is_complete(&self) -> Result<bool> {
        Ok(*self.complete.lock().expect("lock"))
    }

    async fn insert_batch(&self, entries: &[IndexEntry]) -> Result<()> {
        if entries.len() > self.max_batch {
            return Err(Error::BatchTooLarge { got: entries.len(), max: self.max_batch });
        }
        self.batch_sizes.lock().expect("lock").push(entries.len());
        self.entries.lock().expect("lock").extend_from_slice(entries);
        Ok(())
    }

    async fn mark_complete(&self) -> Result<()> {
        *self.complete.lock().expect("lock") = true;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.lock().expect("lock").clear();
        *self.complete.lock().expect("lock") = false;
        *self.cleared.lock().expect("lock") += 1;
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let entries = self.entries.lock().expect("lock");
        let mut hits: Vec<ScoredChunk> = entries
            .iter()
            .map(|e| ScoredChunk { chunk: e.chunk.clone(), score: cosine(&e.vector, vector) })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (na * nb).max(1e-12)
}

struct EchoLlm;

#[async_trait]
impl LanguageModel for EchoLlm {
    fn id(&self) -> &str {
        "echo"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(format!("ECHO {prompt}"))
    }
}

#[tokio::test]
async fn ingestion_is_idempotent() {
    let embedder = HashEmbedder::new(16, 32);
    let store = RecordingStore::new(16, 8);
    let doc = Document::new("kjv", GENESIS.repeat(10));
    let config = ChunkerConfig { chunk_size: 40, overlap: 0 };

    let first = ingest(&doc, &config, &embedder, &store).await.expect("first ingest");
    assert!(!first.skipped);
    let ids_after_first = store.entry_ids();
    let calls_after_first = store.batch_sizes().len();

    // Second and third runs: completion marker short-circuits, zero inserts.
    let second = ingest(&doc, &config, &embedder, &store).await.expect("second ingest");
    assert!(second.skipped);
    assert_eq!(second.chunks, 0);
    assert_eq!(store.entry_ids(), ids_after_first);
    assert_eq!(store.batch_sizes().len(), calls_after_first);
}

#[tokio::test]
async fn repeated_ingestion_of_fresh_stores_is_deterministic() {
    let embedder = HashEmbedder::new(16, 32);
    let doc = Document::new("kjv", GENESIS.repeat(10));
    let config = ChunkerConfig { chunk_size: 40, overlap: 10 };

    let a = RecordingStore::new(16, 8);
    let b = RecordingStore::new(16, 8);
    ingest(&doc, &config, &embedder, &a).await.expect("ingest a");
    ingest(&doc, &config, &embedder, &b).await.expect("ingest b");

    let ea = a.entries.lock().expect("lock");
    let eb = b.entries.lock().expect("lock");
    assert_eq!(ea.len(), eb.len());
    for (x, y) in ea.iter().zip(eb.iter()) {
        assert_eq!(x.chunk, y.chunk);
        assert_eq!(x.vector, y.vector);
    }
}

#[tokio::test]
async fn ingest_issues_ceil_n_over_b_batches() {
    // The historical failure mode this pipeline exists to avoid: 31102
    // verses against a 5461-entry ceiling must become 6 insert calls.
    let embedder = HashEmbedder::new(8, 4096);
    let store = RecordingStore::new(8, 5461);
    let doc = Document::new("kjv", "a".repeat(31102));
    let config = ChunkerConfig { chunk_size: 1, overlap: 0 };

    let report = ingest(&doc, &config, &embedder, &store).await.expect("ingest");
    assert_eq!(report.chunks, 31102);
    assert_eq!(report.batches, 6);

    let sizes = store.batch_sizes();
    assert_eq!(sizes.len(), 6);
    assert!(sizes.iter().all(|&s| s <= 5461));
    assert_eq!(sizes.iter().sum::<usize>(), 31102);
    assert_eq!(*sizes.last().expect("last"), 31102 - 5 * 5461);
}

#[tokio::test]
async fn store_rejects_one_oversized_insert() {
    let store = RecordingStore::new(4, 5461);
    let entries: Vec<IndexEntry> = (0..31102)
        .map(|i| IndexEntry {
            chunk: versed_core::types::Chunk {
                id: format!("kjv:{i}"),
                index: i,
                text: "a".to_string(),
                start: i,
                end: i + 1,
            },
            vector: vec![0.0; 4],
        })
        .collect();

    let err = store.insert_batch(&entries).await.unwrap_err();
    assert!(matches!(err, Error::BatchTooLarge { got: 31102, max: 5461 }));
}

#[tokio::test]
async fn incomplete_store_is_rebuilt() {
    let embedder = HashEmbedder::new(16, 32);
    let store = RecordingStore::new(16, 8);
    let doc = Document::new("kjv", GENESIS.repeat(4));
    let config = ChunkerConfig { chunk_size: 40, overlap: 0 };

    // Simulate a crash between batches: entries present, no marker.
    store
        .insert_batch(&[IndexEntry {
            chunk: versed_core::types::Chunk {
                id: "stale:0".to_string(),
                index: 0,
                text: "stale".to_string(),
                start: 0,
                end: 5,
            },
            vector: vec![0.0; 16],
        }])
        .await
        .expect("seed");

    let report = ingest(&doc, &config, &embedder, &store).await.expect("ingest");
    assert!(!report.skipped);
    assert_eq!(*store.cleared.lock().expect("lock"), 1);
    assert!(
        store.entry_ids().iter().all(|id| id.starts_with("kjv:")),
        "stale entries must be gone"
    );
    assert!(store.is_complete().await.expect("complete"));
}

#[tokio::test]
async fn mismatched_embedder_and_store_dims_fail_fast() {
    let embedder = HashEmbedder::new(32, 8);
    let store = RecordingStore::new(16, 8);
    let doc = Document::new("kjv", GENESIS);

    let err = ingest(&doc, &ChunkerConfig::default(), &embedder, &store).await.unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { got: 32, want: 16 }));
    assert!(store.batch_sizes().is_empty());
}

#[tokio::test]
async fn genesis_end_to_end_through_a_real_store() {
    let tmp = TempDir::new().expect("tmp");
    let embedder = HashEmbedder::new(64, 16);
    let store = VectorStore::open(tmp.path(), "passages", 64, 1).await.expect("open");
    let doc = Document::new("kjv", GENESIS);
    let config = ChunkerConfig { chunk_size: 60, overlap: 0 };

    let report = ingest(&doc, &config, &embedder, &store).await.expect("ingest");
    assert_eq!(report.chunks, 1, "54 chars in a 60-char window is one chunk");
    assert_eq!(report.batches, 1, "one chunk under max_batch_size=1 is one insert");

    let hits = retrieve(GENESIS, &embedder, &store, 3).await.expect("retrieve");
    assert_eq!(hits.len(), 1, "store holds a single entry");
    assert_eq!(hits[0].chunk.text, GENESIS);
    assert!(hits[0].score > 0.99, "same text embeds to a self-match, got {}", hits[0].score);

    let answer = generate("Who created the heaven?", &hits, &EchoLlm).await.expect("generate");
    assert!(answer.text.contains("[1] In the beginning"));
    assert!(answer.text.contains("Who created the heaven?"));
    assert_eq!(answer.references.len(), 1);
    assert_eq!(answer.references[0].chunk_id, "kjv:0");
}

#[tokio::test]
async fn retrieve_rejects_zero_k_and_blank_questions() {
    let embedder = HashEmbedder::new(16, 8);
    let store = RecordingStore::new(16, 8);

    let err = retrieve("why?", &embedder, &store, 0).await.unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));

    let err = retrieve("   ", &embedder, &store, 3).await.unwrap_err();
    assert!(matches!(err, Error::EmptyInput(_)));
}

#[tokio::test]
async fn empty_context_is_refused() {
    let err = generate("anything", &[], &EchoLlm).await.unwrap_err();
    assert!(matches!(err, Error::EmptyContext));
}

#[tokio::test]
async fn context_assembly_respects_the_char_budget() {
    let hits: Vec<ScoredChunk> = (0..3)
        .map(|i| ScoredChunk {
            chunk: versed_core::types::Chunk {
                id: format!("kjv:{i}"),
                index: i,
                text: "x".repeat(900),
                start: 0,
                end: 900,
            },
            score: 1.0 - i as f32 * 0.1,
        })
        .collect();

    let answer = generate("q", &hits, &EchoLlm).await.expect("generate");
    // 900 + 900 crosses the 1500-char budget, so the third snippet is cut.
    assert_eq!(answer.references.len(), 2);
    assert!(answer.text.contains("[1] "));
    assert!(answer.text.contains("[2] "));
    assert!(!answer.text.contains("[3] "));
}

#[test]
fn cited_indices_are_parsed_sorted_and_deduped() {
    let text = "As [2] notes, the light came first [1]; see also [2].\n\nReferences\n[1] ...\n[2] ...";
    assert_eq!(cited_indices(text), vec![1, 2]);
    assert!(cited_indices("no citations here").is_empty());
}
