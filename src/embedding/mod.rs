//! Embedding service client (C2).
//!
//! Batch-encodes texts via a remote HTTP service, preserving input order
//! and surfacing the service's declared model/dimension.

mod client;

pub use client::HttpEmbedder;

use async_trait::async_trait;

use crate::error::Result;

/// Batch-encodes texts into fixed-dimension vectors.
///
/// Implementations must be safe to call concurrently from multiple
/// workflow invocations without external locking.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Encodes `texts`, preserving order. `len(result) == len(texts)`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx response, or a
    /// mismatch between the requested and returned vector counts.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// The dimension of vectors this embedder produces.
    fn dimension(&self) -> usize;

    /// The model identity reported by the service at construction time.
    fn model_name(&self) -> &str;
}

/// Computes cosine similarity between two equal-length vectors.
///
/// Returns 0.0 for mismatched lengths or a zero-magnitude vector, rather
/// than panicking.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
