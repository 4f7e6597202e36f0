use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::error::Result;

/// The raw corpus text, loaded once at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Document {
    /// Short name used as the chunk id prefix (file stem by default).
    pub name: String,
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }

    /// Read the corpus file, falling back to lossy UTF-8 for files with
    /// stray invalid bytes.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => {
                let bytes = fs::read(path)
                    .with_context(|| format!("failed to read corpus file {}", path.display()))?;
                String::from_utf8_lossy(&bytes).to_string()
            }
        };
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "corpus".to_string());
        Ok(Self { name, text })
    }
}
