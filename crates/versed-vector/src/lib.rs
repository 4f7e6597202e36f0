//! LanceDB-backed persistent vector store.

pub mod schema;
pub mod store;

pub use store::VectorStore;
