//! Vector store adapter (C3).
//!
//! Persists chunk metadata and embeddings in `SQLite`, searched through an
//! in-memory ANN index rebuilt from the database at open time. `insert`,
//! `search`, and `delete_report` are the whole of the contract other
//! components depend on.

pub mod hnsw;
pub mod schema;
pub mod sqlite;

pub use hnsw::{HnswConfig, HnswIndex, HnswResult};
pub use sqlite::{ScoredChunk, SearchFilter, VectorRecord, VectorStore};
