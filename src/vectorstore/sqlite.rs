//! `SQLite`-backed vector store: scalar chunk metadata persisted in
//! `SQLite`, embeddings searched through an in-memory [`HnswIndex`] that is
//! rebuilt from the database on open.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::chunking::{Chunk, ChunkType};
use crate::error::{Result, VectorStoreError};
use crate::vectorstore::hnsw::{HnswConfig, HnswIndex};
use crate::vectorstore::schema::{
    get_migrations_from, update_version_sql, CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION,
    GET_VERSION_SQL, SCHEMA_SQL, SET_VERSION_SQL,
};

/// A chunk plus the embedding vector it was stored with.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// The chunk this record represents.
    pub chunk: Chunk,
    /// Embedding vector, of length matching the store's configured dimension.
    pub embedding: Vec<f32>,
}

/// One scored search hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query vector.
    pub similarity: f32,
}

/// Scalar filters applied alongside the ANN search.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Restrict to one report id, if set.
    pub report_id: Option<String>,
    /// Restrict to one company code, if set.
    pub company_code: Option<String>,
    /// Restrict to chunks of this type, if set.
    pub chunk_type: Option<ChunkType>,
}

/// Persistent store for chunk metadata and embeddings, backed by `SQLite`
/// plus an in-memory ANN index.
pub struct VectorStore {
    conn: Connection,
    index: HnswIndex,
    path: Option<PathBuf>,
}

impl VectorStore {
    /// Opens (creating if needed) a vector store at `path`, sized for
    /// `dimensions`-wide embeddings.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, migrated, or if
    /// rebuilding the in-memory index from persisted rows fails.
    pub fn open<P: AsRef<Path>>(path: P, dimensions: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    VectorStoreError::Database(format!("failed to create {parent:?}: {e}"))
                })?;
            }
        }

        let conn = Connection::open(&path).map_err(VectorStoreError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(VectorStoreError::from)?;
        let _: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .map_err(VectorStoreError::from)?;

        let mut store = Self {
            conn,
            index: HnswIndex::new(&HnswConfig::with_dimensions(dimensions))?,
            path: Some(path),
        };
        store.init_schema()?;
        store.rebuild_index()?;
        Ok(store)
    }

    /// Opens an in-memory store, useful for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn in_memory(dimensions: usize) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(VectorStoreError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(VectorStoreError::from)?;
        let mut store = Self {
            conn,
            index: HnswIndex::new(&HnswConfig::with_dimensions(dimensions))?,
            path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Path to the backing database file, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of vectors currently indexed in memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the store holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn init_schema(&self) -> Result<()> {
        let initialized: i64 = self
            .conn
            .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
            .map_err(VectorStoreError::from)?;

        if initialized == 0 {
            self.conn
                .execute_batch(SCHEMA_SQL)
                .map_err(VectorStoreError::from)?;
            self.conn
                .execute(SET_VERSION_SQL, params![CURRENT_SCHEMA_VERSION])
                .map_err(VectorStoreError::from)?;
            return Ok(());
        }

        let current: Option<u32> = self
            .conn
            .query_row(GET_VERSION_SQL, [], |row| row.get(0))
            .optional()
            .map_err(VectorStoreError::from)?;

        if let Some(current) = current {
            if current < CURRENT_SCHEMA_VERSION {
                for migration in get_migrations_from(current) {
                    self.conn
                        .execute_batch(migration.sql)
                        .map_err(|e| VectorStoreError::Migration(e.to_string()))?;
                }
                self.conn
                    .execute(update_version_sql(), params![CURRENT_SCHEMA_VERSION])
                    .map_err(VectorStoreError::from)?;
            }
        }
        Ok(())
    }

    fn rebuild_index(&mut self) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT chunk_id, embedding FROM chunks")
            .map_err(VectorStoreError::from)?;
        let rows = stmt
            .query_map([], |row| {
                let chunk_id: String = row.get(0)?;
                let blob: Vec<u8> = row.get(1)?;
                Ok((chunk_id, blob))
            })
            .map_err(VectorStoreError::from)?;

        for row in rows {
            let (chunk_id, blob) = row.map_err(VectorStoreError::from)?;
            let vector = decode_embedding(&blob);
            self.index.add(&chunk_id, &vector)?;
        }
        Ok(())
    }

    /// Inserts `chunks` and their `embeddings`, which must have equal
    /// length and one vector per chunk in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError::Precondition`] on a length mismatch, or
    /// propagates database/index errors.
    pub fn insert(&mut self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(VectorStoreError::Precondition {
                reason: format!(
                    "{} chunks but {} embeddings",
                    chunks.len(),
                    embeddings.len()
                ),
            }
            .into());
        }

        let tx = self.conn.transaction().map_err(VectorStoreError::from)?;
        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            tx.execute(
                r"
                INSERT OR REPLACE INTO chunks (
                    chunk_id, report_id, company_name, company_code, report_period,
                    title, title_level, chunk_text, chunk_type, chunk_index,
                    page_number, file_path, created_at, embedding
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                ",
                params![
                    chunk.chunk_id,
                    chunk.report_id,
                    chunk.company_name,
                    chunk.company_code,
                    chunk.report_period,
                    chunk.title,
                    chunk.title_level,
                    chunk.chunk_text,
                    chunk.chunk_type.as_str(),
                    i64::try_from(chunk.chunk_index).unwrap_or(i64::MAX),
                    chunk.page_number,
                    chunk.file_path,
                    chunk.created_at,
                    encode_embedding(embedding),
                ],
            )
            .map_err(VectorStoreError::from)?;
        }
        tx.commit().map_err(VectorStoreError::from)?;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            self.index.add(&chunk.chunk_id, embedding)?;
        }
        Ok(())
    }

    /// Returns the `top_k` chunks most similar to `query`, restricted to
    /// `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the ANN search or the row lookup fails.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredChunk>> {
        // Over-fetch from the ANN index since scalar filters are applied
        // after: a filtered-out hit should not shrink the result below
        // top_k when a less-similar match would satisfy the filter.
        let fetch = top_k.saturating_mul(8).max(top_k).max(32);
        let hits = self.index.search(query, fetch)?;

        let mut results = Vec::with_capacity(top_k);
        for hit in hits {
            if results.len() >= top_k {
                break;
            }
            let Some(chunk) = self.get_chunk(&hit.chunk_id)? else {
                continue;
            };
            if let Some(report_id) = &filter.report_id {
                if &chunk.report_id != report_id {
                    continue;
                }
            }
            if let Some(company_code) = &filter.company_code {
                if &chunk.company_code != company_code {
                    continue;
                }
            }
            if let Some(chunk_type) = &filter.chunk_type {
                if &chunk.chunk_type != chunk_type {
                    continue;
                }
            }
            results.push(ScoredChunk {
                chunk,
                similarity: hit.similarity,
            });
        }
        Ok(results)
    }

    /// Deletes every chunk belonging to `report_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete or index removal fails.
    pub fn delete_report(&mut self, report_id: &str) -> Result<usize> {
        let chunk_ids: Vec<String> = {
            let mut stmt = self
                .conn
                .prepare("SELECT chunk_id FROM chunks WHERE report_id = ?1")
                .map_err(VectorStoreError::from)?;
            let rows = stmt
                .query_map(params![report_id], |row| row.get(0))
                .map_err(VectorStoreError::from)?;
            rows.collect::<rusqlite::Result<_>>()
                .map_err(VectorStoreError::from)?
        };

        self.conn
            .execute(
                "DELETE FROM chunks WHERE report_id = ?1",
                params![report_id],
            )
            .map_err(VectorStoreError::from)?;

        for chunk_id in &chunk_ids {
            self.index.remove(chunk_id)?;
        }
        Ok(chunk_ids.len())
    }

    fn get_chunk(&self, chunk_id: &str) -> Result<Option<Chunk>> {
        self.conn
            .query_row(
                r"
                SELECT chunk_id, report_id, company_name, company_code, report_period,
                       title, title_level, chunk_text, chunk_type, chunk_index,
                       page_number, file_path, created_at
                FROM chunks WHERE chunk_id = ?1
                ",
                params![chunk_id],
                row_to_chunk,
            )
            .optional()
            .map_err(|e| VectorStoreError::from(e).into())
    }
}

fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chunk> {
    let chunk_index: i64 = row.get(9)?;
    let type_str: String = row.get(8)?;
    Ok(Chunk {
        chunk_id: row.get(0)?,
        report_id: row.get(1)?,
        company_name: row.get(2)?,
        company_code: row.get(3)?,
        report_period: row.get(4)?,
        title: row.get(5)?,
        title_level: row.get(6)?,
        chunk_text: row.get(7)?,
        chunk_type: ChunkType::from_str(&type_str),
        chunk_index: usize::try_from(chunk_index).unwrap_or(0),
        page_number: row.get(10)?,
        file_path: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;

    fn sample_chunk(chunk_id: &str, report_id: &str) -> Chunk {
        Chunk {
            chunk_id: chunk_id.to_string(),
            report_id: report_id.to_string(),
            company_name: "Acme".to_string(),
            company_code: "000001".to_string(),
            report_period: "2024-03-31".to_string(),
            title: "Summary".to_string(),
            title_level: 1,
            chunk_text: "text".to_string(),
            chunk_type: ChunkType::Summary,
            chunk_index: 0,
            page_number: 1,
            file_path: "f.md".to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn test_insert_and_search_roundtrip() {
        let mut store = VectorStore::in_memory(3).unwrap();
        let chunk = sample_chunk("ck_0000", "r1");
        store.insert(&[chunk], &[vec![1.0, 0.0, 0.0]]).unwrap();

        let results = store
            .search(&[1.0, 0.0, 0.0], 5, &SearchFilter::default())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.chunk_id, "ck_0000");
    }

    #[test]
    fn test_mismatched_lengths_is_precondition_error() {
        let mut store = VectorStore::in_memory(3).unwrap();
        let chunk = sample_chunk("ck_0000", "r1");
        let err = store.insert(&[chunk], &[]).unwrap_err();
        assert!(matches!(err.kind(), crate::error::ErrorKind::Precondition));
    }

    #[test]
    fn test_search_filters_by_report_id() {
        let mut store = VectorStore::in_memory(3).unwrap();
        store
            .insert(
                &[sample_chunk("ck_0000", "r1"), sample_chunk("ck_0001", "r2")],
                &[vec![1.0, 0.0, 0.0], vec![1.0, 0.0, 0.0]],
            )
            .unwrap();

        let filter = SearchFilter {
            report_id: Some("r2".to_string()),
            ..Default::default()
        };
        let results = store.search(&[1.0, 0.0, 0.0], 5, &filter).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.report_id, "r2");
    }

    #[test]
    fn test_delete_report_removes_all_its_chunks() {
        let mut store = VectorStore::in_memory(3).unwrap();
        store
            .insert(
                &[sample_chunk("ck_0000", "r1"), sample_chunk("ck_0001", "r1")],
                &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            )
            .unwrap();
        let deleted = store.delete_report("r1").unwrap();
        assert_eq!(deleted, 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_reopening_persisted_store_rebuilds_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.db");
        {
            let mut store = VectorStore::open(&path, 3).unwrap();
            store
                .insert(&[sample_chunk("ck_0000", "r1")], &[vec![1.0, 0.0, 0.0]])
                .unwrap();
        }
        let reopened = VectorStore::open(&path, 3).unwrap();
        assert_eq!(reopened.len(), 1);
    }
}
