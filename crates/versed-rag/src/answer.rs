//! Prompt assembly and answer generation.
//!
//! Retrieved passages become numbered snippets `[1]`, `[2]`, ... in ranked
//! order; the prompt instructs the model to answer only from those snippets
//! and to cite them inline. An empty retrieval is a hard `EmptyContext`
//! error — the question is never forwarded to the model without context.

use std::sync::OnceLock;

use regex::Regex;

use versed_core::error::{Error, Result};
use versed_core::traits::LanguageModel;
use versed_core::types::{Answer, Reference, ScoredChunk};

/// Chars kept per snippet before truncation.
const SNIPPET_MAX_CHARS: usize = 1000;
/// Assembly stops once this many context chars have accumulated.
const CONTEXT_MAX_CHARS: usize = 1500;

/// Render ranked hits into the numbered context block plus the reference
/// list describing each included snippet.
pub fn build_context(context: &[ScoredChunk]) -> (String, Vec<Reference>) {
    let mut parts = Vec::new();
    let mut references = Vec::new();
    let mut total = 0usize;
    for (i, hit) in context.iter().enumerate() {
        let index = i + 1;
        let flat = hit.chunk.text.replace('\n', " ");
        let snippet = flat.chars().take(SNIPPET_MAX_CHARS).collect::<String>().trim().to_string();
        references.push(Reference {
            index,
            chunk_id: hit.chunk.id.clone(),
            start: hit.chunk.start,
            end: hit.chunk.end,
        });
        total += snippet.chars().count();
        parts.push(format!("[{index}] {snippet}"));
        if total >= CONTEXT_MAX_CHARS {
            break;
        }
    }
    (parts.join("\n\n"), references)
}

fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a careful reader of the corpus below. Use only the Context to answer the Question.\n\n\
         The Context contains numbered snippets like [1], [2], ... When you use information from the Context, \
         cite the snippet number inline (for example: [1]). At the end of your answer include a 'References' \
         section listing each number you cited.\n\n\
         Context:\n{context}\n\nQuestion:\n{question}\n"
    )
}

/// One non-streaming completion conditioned on the retrieved context.
pub async fn generate(
    question: &str,
    context: &[ScoredChunk],
    model: &dyn LanguageModel,
) -> Result<Answer> {
    if context.is_empty() {
        return Err(Error::EmptyContext);
    }
    let (context_str, references) = build_context(context);
    let prompt = build_prompt(question, &context_str);
    let text = model.complete(&prompt).await?;
    Ok(Answer { text, context: context.to_vec(), references })
}

/// Snippet numbers the model actually cited in its answer, in ascending
/// order without duplicates.
pub fn cited_indices(answer_text: &str) -> Vec<usize> {
    static CITATION_RE: OnceLock<Regex> = OnceLock::new();
    let re = CITATION_RE
        .get_or_init(|| Regex::new(r"\[(\d+)\]").expect("citation pattern is valid"));
    let mut cited: Vec<usize> = re
        .captures_iter(answer_text)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
        .collect();
    cited.sort_unstable();
    cited.dedup();
    cited
}
