//! Embedding providers.
//!
//! `OllamaEmbedder` talks to a local Ollama server; `HashEmbedder` is a
//! deterministic offline stand-in for tests and development, selected by
//! `VERSED_USE_FAKE_EMBEDDINGS=1`.

pub mod hash;
pub mod ollama;

pub use hash::HashEmbedder;
pub use ollama::OllamaEmbedder;

use versed_core::config::EmbeddingSettings;
use versed_core::error::Result;
use versed_core::traits::Embedder;

/// Build the embedder configured in settings, honoring the fake-embeddings
/// escape hatch for offline runs.
pub fn default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("VERSED_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        tracing::info!(dim = settings.dim, "using deterministic hash embedder");
        return Ok(Box::new(HashEmbedder::new(settings.dim, settings.max_batch_size)));
    }
    Ok(Box::new(OllamaEmbedder::new(
        &settings.base_url,
        &settings.model,
        settings.dim,
        settings.max_batch_size,
    )?))
}

/// Shared preconditions for every `embed` call: at least one text, at most
/// `max_batch` of them.
pub(crate) fn check_batch(texts: &[String], max_batch: usize) -> Result<()> {
    use versed_core::error::Error;
    if texts.is_empty() {
        return Err(Error::EmptyInput("no texts to embed".to_string()));
    }
    if texts.len() > max_batch {
        return Err(Error::ProviderLimit { got: texts.len(), max: max_batch });
    }
    Ok(())
}
