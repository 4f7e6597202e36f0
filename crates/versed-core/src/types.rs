//! Domain types shared by the ingestion and query paths.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// A bounded span of corpus text that is independently embedded and indexed.
///
/// - `id`: globally unique within a store, `"{document}:{index}"`
/// - `index`: position in document order
/// - `text`: the payload handed to the embedder and the prompt
/// - `start`/`end`: byte offsets of the span in the source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub index: usize,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A chunk paired with its embedding, as persisted by the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// One retrieval hit. `score` is cosine similarity; higher is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// A numbered snippet reference the model can cite in its answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    /// 1-based snippet number as it appears in the prompt context.
    pub index: usize,
    pub chunk_id: ChunkId,
    pub start: usize,
    pub end: usize,
}

/// The generated answer together with the context it was conditioned on.
/// Transient; never persisted.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub context: Vec<ScoredChunk>,
    pub references: Vec<Reference>,
}
