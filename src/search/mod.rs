//! Rank fusion utilities.
//!
//! Not wired into the retrieval path directly — [`crate::retriever`]
//! composes sections from a single filtered ANN search per section — but
//! kept as a building block for combining ranked lists (e.g. BM25 and
//! semantic rankings) should a caller need to.

mod rrf;

pub use rrf::{reciprocal_rank_fusion, weighted_rrf, RrfConfig};
