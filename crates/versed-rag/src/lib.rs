//! The retrieval-augmented answering pipeline.
//!
//! `ingest` builds the persistent index once, `retrieve` embeds a question
//! and fetches the closest passages, `generate` turns them into a cited
//! answer. All collaborators are capability traits from `versed-core`.

pub mod answer;
pub mod ingest;
pub mod llm;
pub mod retrieve;

pub use answer::{cited_indices, generate};
pub use ingest::{ingest, IngestReport};
pub use llm::OllamaGenerator;
pub use retrieve::retrieve;
