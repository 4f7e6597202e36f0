use versed_core::error::{Error, Result};
use versed_core::traits::{Embedder, VectorIndex};
use versed_core::types::ScoredChunk;

/// Embed `question` (a single-item batch) and fetch the `k` most similar
/// passages, best first.
pub async fn retrieve(
    question: &str,
    embedder: &dyn Embedder,
    store: &dyn VectorIndex,
    k: usize,
) -> Result<Vec<ScoredChunk>> {
    if k == 0 {
        return Err(Error::InvalidConfig("retrieval k must be > 0".to_string()));
    }
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyInput("question is empty".to_string()));
    }
    let vectors = embedder.embed(&[trimmed.to_string()]).await?;
    let vector = vectors
        .into_iter()
        .next()
        .ok_or_else(|| Error::Provider("embedder returned no vector for the question".to_string()))?;
    store.query(&vector, k).await
}
