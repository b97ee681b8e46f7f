//! Structure-aware Markdown chunking.
//!
//! Turns a filing into semantically coherent chunks: heading-inheriting,
//! table-preserving, sentence-boundary-respecting. See [`markdown`] for the
//! block parser and segmentation algorithm.

pub mod chunk;
pub mod classify;
pub mod markdown;

pub use chunk::{
    Chunk, ChunkType, MAX_CHUNK_ID_BYTES, MAX_CHUNK_TEXT_BYTES, MAX_FILE_PATH_BYTES,
    MAX_TITLE_BYTES,
};
pub use markdown::{chunk_file, chunk_markdown, ChunkConfig};
