//! Retrieval context composer (C6).
//!
//! Assembles up to three labeled sections of retrieved chunk text for one
//! report: the current period, a short historical comparison, and,
//! optionally, content related to a free-text query. The result is a
//! single string capped at [`MAX_CONTEXT_CHARS`], suffix-truncated.

use std::sync::Arc;

use crate::chunking::ChunkType;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vectorstore::{SearchFilter, VectorStore};

/// Character cap on the assembled context string.
pub const MAX_CONTEXT_CHARS: usize = 2000;
/// Marker appended when the assembled context is truncated to fit the cap.
pub const TRUNCATION_SUFFIX: &str = "...[truncated]";

const CURRENT_PERIOD_TOP_K: usize = 5;
const HISTORICAL_PERIOD_LIMIT: usize = 2;
const HISTORICAL_TOP_K: usize = 3;
const RELATED_TOP_K: usize = 3;

/// Composes retrieval context for report-writing nodes.
///
/// Shares the vector store handle and embedder with the rest of the
/// process; safe to call from multiple workflow invocations concurrently
/// since both collaborators are read-mostly after construction.
pub struct Retriever {
    store: Arc<std::sync::Mutex<VectorStore>>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    /// Builds a retriever over a shared vector store and embedder.
    #[must_use]
    pub fn new(store: Arc<std::sync::Mutex<VectorStore>>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Assembles labeled context for `company_name`/`report_period`,
    /// optionally enriched with a `query`-driven "related reference"
    /// section.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedder or vector store fails; a store
    /// with no matching chunks yields an empty string, not an error.
    pub async fn get_context(
        &self,
        company_code: &str,
        report_period: &str,
        query: Option<&str>,
    ) -> Result<String> {
        let mut sections = Vec::new();

        let current_texts = self
            .search_section(company_code, Some(report_period), None, CURRENT_PERIOD_TOP_K)
            .await?;
        if !current_texts.is_empty() {
            sections.push(format!("=== current period ===\n{}", current_texts.join("\n")));
        }

        let historical = self.historical_comparison(company_code, report_period).await?;
        if !historical.is_empty() {
            sections.push(format!("=== historical comparison ===\n{historical}"));
        }

        if let Some(query) = query {
            let related_texts = self.search_section(company_code, None, Some(query), RELATED_TOP_K).await?;
            if !related_texts.is_empty() {
                sections.push(format!("=== related reference ===\n{}", related_texts.join("\n")));
            }
        }

        Ok(cap_context(&sections.join("\n\n")))
    }

    /// Runs one semantic search, filtered by company and optionally period,
    /// against `query_text` (defaulting to `company_code` itself so a
    /// period-only lookup still has something to embed).
    async fn search_section(
        &self,
        company_code: &str,
        report_period: Option<&str>,
        query_text: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<String>> {
        let text = query_text.unwrap_or(company_code).to_string();
        let vectors = self.embedder.encode(std::slice::from_ref(&text)).await?;
        let Some(query_vector) = vectors.into_iter().next() else {
            return Ok(Vec::new());
        };

        let filter = SearchFilter {
            report_id: report_period.map(|period| format!("{company_code}_{period}")),
            company_code: report_period.is_none().then(|| company_code.to_string()),
            chunk_type: None,
        };

        let store = self.store.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let hits = store.search(&query_vector, top_k, &filter)?;
        drop(store);
        Ok(hits.into_iter().map(|hit| hit.chunk.chunk_text).collect())
    }

    /// Retrieves up to [`HISTORICAL_PERIOD_LIMIT`] prior periods' chunks for
    /// `company_code`, excluding `report_period` itself, grouped under
    /// per-period headers.
    async fn historical_comparison(&self, company_code: &str, report_period: &str) -> Result<String> {
        let vectors = self.embedder.encode(std::slice::from_ref(&company_code.to_string())).await?;
        let Some(query_vector) = vectors.into_iter().next() else {
            return Ok(String::new());
        };

        let filter = SearchFilter {
            report_id: None,
            company_code: Some(company_code.to_string()),
            chunk_type: None,
        };

        let hits = {
            let store = self.store.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            store.search(&query_vector, HISTORICAL_TOP_K * HISTORICAL_PERIOD_LIMIT * 4, &filter)?
        };

        let mut periods_seen: Vec<String> = Vec::new();
        let mut blocks: Vec<String> = Vec::new();
        for period in hits.iter().map(|hit| hit.chunk.report_period.clone()) {
            if period == report_period || periods_seen.contains(&period) {
                continue;
            }
            if periods_seen.len() >= HISTORICAL_PERIOD_LIMIT {
                break;
            }
            periods_seen.push(period);
        }

        for period in &periods_seen {
            let texts: Vec<String> = hits
                .iter()
                .filter(|hit| &hit.chunk.report_period == period)
                .take(HISTORICAL_TOP_K)
                .map(|hit| hit.chunk.chunk_text.clone())
                .collect();
            if !texts.is_empty() {
                blocks.push(format!("{period}:\n{}", texts.join("\n")));
            }
        }

        Ok(blocks.join("\n\n"))
    }
}

/// Restricts a search to `table`-classified chunks, used by report nodes
/// that want only tabular evidence.
#[must_use]
pub fn table_only_filter(report_id: &str) -> SearchFilter {
    SearchFilter {
        report_id: Some(report_id.to_string()),
        company_code: None,
        chunk_type: Some(ChunkType::Table),
    }
}

/// Truncates `context` to [`MAX_CONTEXT_CHARS`] characters, appending
/// [`TRUNCATION_SUFFIX`] when truncation occurs. Truncation respects
/// character (not byte) boundaries.
#[must_use]
pub fn cap_context(context: &str) -> String {
    let char_count = context.chars().count();
    if char_count <= MAX_CONTEXT_CHARS {
        return context.to_string();
    }
    let keep = MAX_CONTEXT_CHARS.saturating_sub(TRUNCATION_SUFFIX.chars().count());
    let truncated: String = context.chars().take(keep).collect();
    format!("{truncated}{TRUNCATION_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cap_context_short_unchanged() {
        let text = "short context";
        assert_eq!(cap_context(text), text);
    }

    #[test]
    fn test_cap_context_truncates_with_suffix() {
        let text = "x".repeat(3000);
        let capped = cap_context(&text);
        assert_eq!(capped.chars().count(), MAX_CONTEXT_CHARS);
        assert!(capped.ends_with(TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_table_only_filter_sets_chunk_type() {
        let filter = table_only_filter("r1");
        assert_eq!(filter.chunk_type, Some(ChunkType::Table));
        assert_eq!(filter.report_id, Some("r1".to_string()));
    }
}
