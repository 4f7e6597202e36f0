//! Settings loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `VERSED_*`
//! env vars into a typed [`Settings`] struct with serde defaults, then
//! validates the numeric parameters up front so misconfiguration fails at
//! startup rather than on the first provider call.

use std::env;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env as FigmentEnv, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::chunker::ChunkerConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Path to the single corpus text file. Supports `~` and `${VAR}`.
    pub path: String,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self { path: "data/corpus.txt".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// LanceDB directory. Reopening the same directory reuses its data.
    pub db_dir: String,
    pub collection: String,
    /// Ceiling on entries per insert call; the ingestor splits to respect it.
    pub max_batch_size: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_dir: "data/index/lancedb".to_string(),
            collection: "passages".to_string(),
            max_batch_size: 5461,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub base_url: String,
    pub model: String,
    /// Output dimensionality; must match the store's vector column.
    pub dim: usize,
    /// Maximum texts per embed call accepted by the provider.
    pub max_batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "mxbai-embed-large".to_string(),
            dim: 1024,
            max_batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "codeqwen".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Passages retrieved per question; bounds the prompt size.
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub corpus: CorpusSettings,
    pub store: StoreSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub chunking: ChunkerConfig,
    pub retrieval: RetrievalSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from_dir(Path::new("."))
    }

    /// Like [`Settings::load`], but reads the config files from `dir`
    /// instead of the current working directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => {
                figment = figment.merge(Toml::file(dir.join("config.dev.toml")));
            }
            "prod" | "production" => {
                figment = figment.merge(Toml::file(dir.join("config.prod.toml")));
            }
            "test" | "testing" => {
                figment = figment.merge(Toml::file(dir.join("config.test.toml")));
            }
            _ => {}
        }
        figment = figment.merge(FigmentEnv::prefixed("VERSED_").split("__"));

        let settings: Settings = figment
            .extract()
            .map_err(|e| Error::InvalidConfig(format!("failed to load settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.store.max_batch_size == 0 {
            return Err(Error::InvalidConfig("store.max_batch_size must be > 0".to_string()));
        }
        if self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be > 0".to_string()));
        }
        if self.embedding.max_batch_size == 0 {
            return Err(Error::InvalidConfig(
                "embedding.max_batch_size must be > 0".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn corpus_path(&self) -> PathBuf {
        expand_path(&self.corpus.path)
    }

    pub fn db_dir(&self) -> PathBuf {
        expand_path(&self.store.db_dir)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
