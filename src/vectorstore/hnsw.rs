//! HNSW approximate-nearest-neighbor index over chunk embeddings.
//!
//! Wraps usearch when the `usearch-hnsw` feature is enabled; falls back to
//! brute-force cosine search otherwise so the crate builds and behaves
//! correctly without the optional native dependency.

use std::collections::HashMap;
#[cfg(feature = "usearch-hnsw")]
use std::path::Path;

#[cfg(feature = "usearch-hnsw")]
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::embedding::cosine_similarity;
use crate::error::{Result, VectorStoreError};

/// Configuration for the [`HnswIndex`].
///
/// Defaults follow the connectivity and expansion values the filtered-ANN
/// contract mandates: `connectivity = 16`, `expansion_add = 256`.
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Vector dimensionality.
    pub dimensions: usize,
    /// M parameter: max connections per node.
    pub connectivity: usize,
    /// `ef_construction`: search depth while building the index.
    pub expansion_add: usize,
    /// `ef_search`: search depth while querying.
    pub expansion_search: usize,
}

impl HnswConfig {
    /// Creates a configuration for `dimensions`-wide vectors with the
    /// mandated connectivity/expansion values.
    #[must_use]
    pub const fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            connectivity: 16,
            expansion_add: 256,
            expansion_search: 64,
        }
    }
}

/// One search hit: the indexed chunk id and its similarity to the query.
#[derive(Debug, Clone)]
pub struct HnswResult {
    /// The chunk id this vector was inserted under.
    pub chunk_id: String,
    /// Cosine similarity to the query vector, 1.0 being identical.
    pub similarity: f32,
}

/// Nearest-neighbor index over chunk embedding vectors, keyed by
/// [`crate::chunking::Chunk::chunk_id`].
pub struct HnswIndex {
    #[cfg(feature = "usearch-hnsw")]
    inner: Index,
    #[cfg(not(feature = "usearch-hnsw"))]
    brute_force: HashMap<u64, Vec<f32>>,
    id_map: HashMap<u64, String>,
    reverse_map: HashMap<String, u64>,
    next_key: u64,
    dimensions: usize,
}

#[allow(clippy::missing_fields_in_debug)]
impl std::fmt::Debug for HnswIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnswIndex")
            .field("dimensions", &self.dimensions)
            .field("len", &self.len())
            .finish()
    }
}

impl HnswIndex {
    /// Creates a new, empty index.
    ///
    /// # Errors
    ///
    /// Returns an error if usearch index creation fails (feature-enabled
    /// builds only).
    pub fn new(config: &HnswConfig) -> Result<Self> {
        #[cfg(feature = "usearch-hnsw")]
        {
            let options = IndexOptions {
                dimensions: config.dimensions,
                metric: MetricKind::Cos,
                quantization: ScalarKind::F32,
                connectivity: config.connectivity,
                expansion_add: config.expansion_add,
                expansion_search: config.expansion_search,
                multi: false,
            };
            let index = Index::new(&options)
                .map_err(|e| VectorStoreError::Index(format!("failed to create HNSW index: {e}")))?;
            Ok(Self {
                inner: index,
                id_map: HashMap::new(),
                reverse_map: HashMap::new(),
                next_key: 0,
                dimensions: config.dimensions,
            })
        }
        #[cfg(not(feature = "usearch-hnsw"))]
        {
            Ok(Self {
                brute_force: HashMap::new(),
                id_map: HashMap::new(),
                reverse_map: HashMap::new(),
                next_key: 0,
                dimensions: config.dimensions,
            })
        }
    }

    /// Whether this build links the native usearch backend. When `false`,
    /// searches fall back to brute-force cosine comparison.
    #[must_use]
    pub const fn is_native() -> bool {
        cfg!(feature = "usearch-hnsw")
    }

    /// Vector dimensionality this index was built for.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of vectors currently indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_map.len()
    }

    /// Whether the index holds no vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts (or replaces) the vector for `chunk_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if `vector.len()` does not match [`Self::dimensions`],
    /// or if the native index rejects the insertion.
    pub fn add(&mut self, chunk_id: &str, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(VectorStoreError::Precondition {
                reason: format!(
                    "vector has {} dimensions, index expects {}",
                    vector.len(),
                    self.dimensions
                ),
            }
            .into());
        }

        if self.reverse_map.contains_key(chunk_id) {
            self.remove(chunk_id)?;
        }

        let key = self.next_key;
        self.next_key += 1;

        #[cfg(feature = "usearch-hnsw")]
        {
            self.inner
                .add(key, vector)
                .map_err(|e| VectorStoreError::Index(format!("failed to add vector: {e}")))?;
        }
        #[cfg(not(feature = "usearch-hnsw"))]
        {
            self.brute_force.insert(key, vector.to_vec());
        }

        self.id_map.insert(key, chunk_id.to_string());
        self.reverse_map.insert(chunk_id.to_string(), key);
        Ok(())
    }

    /// Removes the vector for `chunk_id`, if present. Returns whether
    /// anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the native index removal call fails.
    pub fn remove(&mut self, chunk_id: &str) -> Result<bool> {
        let Some(key) = self.reverse_map.remove(chunk_id) else {
            return Ok(false);
        };
        self.id_map.remove(&key);

        #[cfg(feature = "usearch-hnsw")]
        {
            self.inner
                .remove(key)
                .map_err(|e| VectorStoreError::Index(format!("failed to remove vector: {e}")))?;
        }
        #[cfg(not(feature = "usearch-hnsw"))]
        {
            self.brute_force.remove(&key);
        }

        Ok(true)
    }

    /// Returns the `k` nearest neighbors to `query`, most similar first.
    ///
    /// # Errors
    ///
    /// Returns an error if `query`'s dimensionality does not match the
    /// index's, or the native search call fails.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<HnswResult>> {
        if query.len() != self.dimensions {
            return Err(VectorStoreError::Precondition {
                reason: format!(
                    "query has {} dimensions, index expects {}",
                    query.len(),
                    self.dimensions
                ),
            }
            .into());
        }

        if self.is_empty() {
            return Ok(Vec::new());
        }

        #[cfg(feature = "usearch-hnsw")]
        {
            let results = self
                .inner
                .search(query, k)
                .map_err(|e| VectorStoreError::Index(format!("search failed: {e}")))?;

            let mut output = Vec::with_capacity(results.keys.len());
            for (key, distance) in results.keys.iter().zip(results.distances.iter()) {
                if let Some(chunk_id) = self.id_map.get(key) {
                    output.push(HnswResult {
                        chunk_id: chunk_id.clone(),
                        similarity: 1.0 - distance,
                    });
                }
            }
            Ok(output)
        }
        #[cfg(not(feature = "usearch-hnsw"))]
        {
            let mut scored: Vec<HnswResult> = self
                .brute_force
                .iter()
                .filter_map(|(key, vector)| {
                    self.id_map.get(key).map(|chunk_id| HnswResult {
                        chunk_id: chunk_id.clone(),
                        similarity: cosine_similarity(query, vector),
                    })
                })
                .collect();
            scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
            scored.truncate(k);
            Ok(scored)
        }
    }

    /// Persists the index to `path` (native builds only).
    ///
    /// # Errors
    ///
    /// Returns an error if saving the index or its id map fails, or if this
    /// build lacks the native backend.
    #[cfg(feature = "usearch-hnsw")]
    pub fn save(&self, path: &Path) -> Result<()> {
        let path_str = path
            .to_str()
            .ok_or_else(|| VectorStoreError::Index("index path is not valid UTF-8".to_string()))?;
        self.inner
            .save(path_str)
            .map_err(|e| VectorStoreError::Index(format!("failed to save index: {e}")))?;

        let map_path = path.with_extension("map");
        let map_data = serde_json::json!({
            "id_map": self.id_map,
            "next_key": self.next_key,
            "dimensions": self.dimensions,
        });
        std::fs::write(&map_path, serde_json::to_vec(&map_data)?)?;
        Ok(())
    }

    /// Persists the index (no-op placeholder; the brute-force fallback has
    /// no native file format to persist).
    #[cfg(not(feature = "usearch-hnsw"))]
    pub fn save(&self, _path: &std::path::Path) -> Result<()> {
        Err(VectorStoreError::Index(
            "persisting the vector index requires the usearch-hnsw feature".to_string(),
        )
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> HnswIndex {
        HnswIndex::new(&HnswConfig::with_dimensions(3)).unwrap()
    }

    #[test]
    fn test_add_and_search_returns_nearest() {
        let mut idx = index();
        idx.add("a", &[1.0, 0.0, 0.0]).unwrap();
        idx.add("b", &[0.0, 1.0, 0.0]).unwrap();
        let results = idx.search(&[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(results[0].chunk_id, "a");
    }

    #[test]
    fn test_dimension_mismatch_is_precondition_error() {
        let mut idx = index();
        let err = idx.add("a", &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err.kind(), crate::error::ErrorKind::Precondition));
    }

    #[test]
    fn test_remove_then_search_excludes_it() {
        let mut idx = index();
        idx.add("a", &[1.0, 0.0, 0.0]).unwrap();
        idx.add("b", &[0.0, 1.0, 0.0]).unwrap();
        assert!(idx.remove("a").unwrap());
        let results = idx.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert!(results.iter().all(|r| r.chunk_id != "a"));
    }

    #[test]
    fn test_remove_missing_returns_false() {
        let mut idx = index();
        assert!(!idx.remove("missing").unwrap());
    }

    #[test]
    fn test_readd_same_chunk_id_replaces_vector() {
        let mut idx = index();
        idx.add("a", &[1.0, 0.0, 0.0]).unwrap();
        idx.add("a", &[0.0, 0.0, 1.0]).unwrap();
        assert_eq!(idx.len(), 1);
        let results = idx.search(&[0.0, 0.0, 1.0], 1).unwrap();
        assert_eq!(results[0].chunk_id, "a");
    }

    #[test]
    fn test_search_empty_index_returns_empty() {
        let idx = index();
        assert!(idx.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }
}
