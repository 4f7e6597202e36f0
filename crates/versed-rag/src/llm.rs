use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use versed_core::config::LlmSettings;
use versed_core::error::{Error, Result};
use versed_core::traits::LanguageModel;

/// Completion client for Ollama's `/api/generate` endpoint, non-streaming.
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    id: String,
    client: Client,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            id: format!("ollama:{model}"),
            client: Client::new(),
        }
    }

    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self::new(&settings.base_url, &settings.model)
    }
}

#[async_trait]
impl LanguageModel for OllamaGenerator {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({ "model": self.model, "prompt": prompt, "stream": false });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("generate request to {url} failed: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("generate request returned {status}: {text}")));
        }

        let payload: GenerateResponse = res
            .json()
            .await
            .map_err(|e| Error::Provider(format!("malformed generate response: {e}")))?;
        Ok(payload.response)
    }
}
