//! I/O utilities: file reading/writing and codepoint-safe Unicode helpers.
//!
//! Every persisted string field in this crate (chunk text, titles, file
//! paths) has a byte cap from the persisted chunk-store limits; the
//! [`unicode`] helpers are what make truncation to those caps safe.

pub mod reader;
pub mod unicode;

pub use reader::{FileReader, read_file, write_chunks, write_file};
pub use unicode::{find_char_boundary, validate_utf8};
