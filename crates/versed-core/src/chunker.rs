//! Deterministic sliding-window chunker.
//!
//! Unit policy: windows are measured in Unicode scalar values (chars), with
//! byte offsets recorded so every chunk can be traced back to the source
//! file. Identical document + parameters always yield the identical chunk
//! sequence; ingestion relies on that for idempotent rebuilds.

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::types::Chunk;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Window length in chars. Must be > 0.
    pub chunk_size: usize,
    /// Chars shared between consecutive chunks. Must be < `chunk_size`.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { chunk_size: 1200, overlap: 120 }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be > 0".to_string()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "overlap {} must be smaller than chunk_size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Chars the window advances between chunks.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Split `document` into chunks in document order. The final chunk may be
/// shorter than `chunk_size`. Pure function; no side effects.
pub fn chunk(document: &Document, config: &ChunkerConfig) -> Result<Vec<Chunk>> {
    config.validate()?;

    // Byte offset of every char boundary, plus the end of the text.
    let mut bounds: Vec<usize> = document.text.char_indices().map(|(i, _)| i).collect();
    bounds.push(document.text.len());
    let n_chars = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < n_chars {
        let end = (start + config.chunk_size).min(n_chars);
        let (b0, b1) = (bounds[start], bounds[end]);
        let index = chunks.len();
        chunks.push(Chunk {
            id: format!("{}:{}", document.name, index),
            index,
            text: document.text[b0..b1].to_string(),
            start: b0,
            end: b1,
        });
        if end == n_chars {
            break;
        }
        start += config.step();
    }
    Ok(chunks)
}
