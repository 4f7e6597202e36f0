use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use versed_core::error::{Error, Result};
use versed_core::traits::Embedder;

/// Embedding client for Ollama's `/api/embed` endpoint.
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dim: usize,
    max_batch: usize,
    id: String,
    client: Client,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, dim: usize, max_batch: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("embedding dim must be > 0".to_string()));
        }
        if max_batch == 0 {
            return Err(Error::InvalidConfig("embedding max_batch must be > 0".to_string()));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dim,
            max_batch,
            id: format!("ollama:{model}:d{dim}"),
            client: Client::new(),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
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

        let url = format!("{}/api/embed", self.base_url);
        let body = json!({ "model": self.model, "input": texts });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("embed request to {url} failed: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("embed request returned {status}: {text}")));
        }

        let payload: EmbedResponse = res
            .json()
            .await
            .map_err(|e| Error::Provider(format!("malformed embed response: {e}")))?;

        if payload.embeddings.len() != texts.len() {
            return Err(Error::Provider(format!(
                "expected {} embeddings, provider returned {}",
                texts.len(),
                payload.embeddings.len()
            )));
        }
        for vector in &payload.embeddings {
            if vector.len() != self.dim {
                return Err(Error::DimensionMismatch { got: vector.len(), want: self.dim });
            }
        }
        Ok(payload.embeddings)
    }
}
