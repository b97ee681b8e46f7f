//! The `Chunk` record produced by the ingestion pipeline.

use serde::{Deserialize, Serialize};

use crate::io::unicode::find_char_boundary;

/// Maximum persisted length of `chunk_text`, in bytes.
pub const MAX_CHUNK_TEXT_BYTES: usize = 8192;
/// Maximum persisted length of `title`, in bytes.
pub const MAX_TITLE_BYTES: usize = 512;
/// Maximum persisted length of `chunk_id`, in bytes.
pub const MAX_CHUNK_ID_BYTES: usize = 128;
/// Maximum persisted length of `file_path`, in bytes.
pub const MAX_FILE_PATH_BYTES: usize = 256;

/// Closed classification of chunk content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    /// High-level summary section.
    Summary,
    /// Business overview / company description.
    BusinessOverview,
    /// Management discussion and analysis.
    ManagementDiscussion,
    /// Financial analysis narrative.
    FinancialAnalysis,
    /// Cash flow discussion.
    Cashflow,
    /// Risk factors.
    Risk,
    /// Corporate governance.
    Governance,
    /// Footnotes / disclosures.
    Notes,
    /// A verbatim `<table>` span.
    Table,
    /// Anything not matched by a more specific rule.
    Other,
}

impl ChunkType {
    /// Returns the wire/display name of this chunk type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::BusinessOverview => "business_overview",
            Self::ManagementDiscussion => "management_discussion",
            Self::FinancialAnalysis => "financial_analysis",
            Self::Cashflow => "cashflow",
            Self::Risk => "risk",
            Self::Governance => "governance",
            Self::Notes => "notes",
            Self::Table => "table",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ChunkType {
    /// Parses the wire/display name produced by [`Self::as_str`]. Unknown
    /// values map to [`Self::Other`] rather than erroring, so a persisted
    /// row from a future chunk type never breaks reads.
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s {
            "summary" => Self::Summary,
            "business_overview" => Self::BusinessOverview,
            "management_discussion" => Self::ManagementDiscussion,
            "financial_analysis" => Self::FinancialAnalysis,
            "cashflow" => Self::Cashflow,
            "risk" => Self::Risk,
            "governance" => Self::Governance,
            "notes" => Self::Notes,
            "table" => Self::Table,
            _ => Self::Other,
        }
    }
}

/// An atomic unit of retrievable text extracted from a filing.
///
/// See the ingestion pipeline's data model: `chunk_id` is stable within a
/// report scope (`ck_<index>`), never mutated once created, and destroyed
/// only via `delete_report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier within the report (`ck_<chunk_index>`).
    pub chunk_id: String,
    /// `company_code + "_" + report_period`.
    pub report_id: String,
    /// Company display name.
    pub company_name: String,
    /// Company code.
    pub company_code: String,
    /// Normalized report period, `YYYY-MM-DD`.
    pub report_period: String,
    /// Last heading in the title path, truncated to [`MAX_TITLE_BYTES`].
    pub title: String,
    /// Heading level of `title`, 0 if the chunk was emitted under no heading.
    pub title_level: u8,
    /// Persisted body text, truncated to [`MAX_CHUNK_TEXT_BYTES`].
    pub chunk_text: String,
    /// Closed classification.
    pub chunk_type: ChunkType,
    /// Dense 0-based index within the report.
    pub chunk_index: usize,
    /// Source page number, -1 when unknown.
    pub page_number: i32,
    /// Source file path, truncated to [`MAX_FILE_PATH_BYTES`].
    pub file_path: String,
    /// Seconds since epoch at creation.
    pub created_at: i64,
}

impl Chunk {
    /// Builds the `report_id` from its constituent parts.
    #[must_use]
    pub fn report_id_for(company_code: &str, report_period: &str) -> String {
        format!("{company_code}_{report_period}")
    }

    /// Builds the stable `chunk_id` for a given index within a report.
    #[must_use]
    pub fn chunk_id_for(index: usize) -> String {
        let id = format!("ck_{index}");
        truncate_bytes(&id, MAX_CHUNK_ID_BYTES)
    }

    /// Truncates `chunk_text` in place to [`MAX_CHUNK_TEXT_BYTES`] on a
    /// codepoint boundary.
    pub fn enforce_text_cap(&mut self) {
        self.chunk_text = truncate_bytes(&self.chunk_text, MAX_CHUNK_TEXT_BYTES);
    }

    /// Truncates `title` in place to [`MAX_TITLE_BYTES`] on a codepoint
    /// boundary.
    pub fn enforce_title_cap(&mut self) {
        self.title = truncate_bytes(&self.title, MAX_TITLE_BYTES);
    }

    /// Truncates `file_path` in place to [`MAX_FILE_PATH_BYTES`] on a
    /// codepoint boundary.
    pub fn enforce_file_path_cap(&mut self) {
        self.file_path = truncate_bytes(&self.file_path, MAX_FILE_PATH_BYTES);
    }

    /// Byte-truncates `chunk_text` to a prefix used as embedding input,
    /// preserving the persisted text at up to [`MAX_CHUNK_TEXT_BYTES`].
    ///
    /// The chunk store keeps the full chunk text; the embedding service
    /// only ever sees the first `embed_truncate_bytes` bytes of it.
    #[must_use]
    pub fn embedding_input(&self, embed_truncate_bytes: usize) -> &str {
        if self.chunk_text.len() <= embed_truncate_bytes {
            &self.chunk_text
        } else {
            let boundary = find_char_boundary(&self.chunk_text, embed_truncate_bytes);
            &self.chunk_text[..boundary]
        }
    }
}

/// Truncates `s` to at most `max_bytes` bytes, backing off to the nearest
/// codepoint boundary at or before the cap.
#[must_use]
pub fn truncate_bytes(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        s.to_string()
    } else {
        let boundary = find_char_boundary(s, max_bytes);
        s[..boundary].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_id_for() {
        assert_eq!(Chunk::report_id_for("600000", "2024-03-31"), "600000_2024-03-31");
    }

    #[test]
    fn test_chunk_id_for() {
        assert_eq!(Chunk::chunk_id_for(0), "ck_0");
        assert_eq!(Chunk::chunk_id_for(41), "ck_41");
    }

    #[test]
    fn test_truncate_bytes_codepoint_safe() {
        let s = "a".repeat(5) + "中文内容";
        let truncated = truncate_bytes(&s, 6);
        assert!(truncated.len() <= 6);
        assert!(String::from_utf8(truncated.into_bytes()).is_ok());
    }

    #[test]
    fn test_embedding_input_prefix() {
        let mut chunk = sample_chunk();
        chunk.chunk_text = "x".repeat(2000);
        let input = chunk.embedding_input(1024);
        assert_eq!(input.len(), 1024);
        assert_eq!(chunk.chunk_text.len(), 2000);
    }

    #[test]
    fn test_embedding_input_short_text_unchanged() {
        let chunk = sample_chunk();
        assert_eq!(chunk.embedding_input(1024), chunk.chunk_text);
    }

    #[test]
    fn test_chunk_type_display() {
        assert_eq!(ChunkType::Table.to_string(), "table");
        assert_eq!(ChunkType::ManagementDiscussion.as_str(), "management_discussion");
    }

    fn sample_chunk() -> Chunk {
        Chunk {
            chunk_id: "ck_0".to_string(),
            report_id: "600000_2024-03-31".to_string(),
            company_name: "Example Co".to_string(),
            company_code: "600000".to_string(),
            report_period: "2024-03-31".to_string(),
            title: "Overview".to_string(),
            title_level: 1,
            chunk_text: "Some body text.".to_string(),
            chunk_type: ChunkType::Other,
            chunk_index: 0,
            page_number: -1,
            file_path: "filing.md".to_string(),
            created_at: 0,
        }
    }
}
