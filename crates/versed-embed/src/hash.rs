//! Deterministic token-hash embedder.
//!
//! Each whitespace token is hashed into one slot of an L2-normalized
//! vector. Not semantically meaningful, but stable across runs and equal
//! texts map to equal vectors, which is what the tests and offline mode
//! need.

use async_trait::async_trait;

use versed_core::error::Result;
use versed_core::traits::Embedder;

pub struct HashEmbedder {
    dim: usize,
    max_batch: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize, max_batch: usize) -> Self {
        Self { dim, max_batch, id: format!("hash:d{dim}") }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_batch(&self) -> usize {
        self.max_batch
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        crate::check_batch(texts, self.max_batch)?;
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
