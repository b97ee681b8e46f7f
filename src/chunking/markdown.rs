//! Markdown block parser and chunk segmentation.
//!
//! A single left-to-right pass turns a filing into a stream of typed
//! blocks (heading / body / code / table), which are then segmented into
//! chunks carrying their inherited heading path.

use std::path::Path;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

use crate::chunking::chunk::{truncate_bytes, Chunk, MAX_CHUNK_TEXT_BYTES, MAX_FILE_PATH_BYTES};
use crate::chunking::classify::classify;
use crate::error::{ChunkingError, Result};
use crate::period::normalize_period;

/// Sentence terminators recognized when splitting an oversized block.
const SENTENCE_TERMINATORS: &[char] = &['。', '！', '？', '!', '?', '；', ';', '．', '.'];

/// Chunk sizing parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    /// Upper bound on a single segment, in bytes, before a forced split.
    pub max_chars: usize,
    /// Segments shorter than this merge into a neighbor.
    pub min_chars: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: 1200,
            min_chars: 200,
        }
    }
}

impl ChunkConfig {
    /// Validates that `min_chars < max_chars`.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkingError::InvalidConfig`] otherwise.
    pub fn validate(&self) -> Result<()> {
        if self.min_chars >= self.max_chars {
            return Err(ChunkingError::InvalidConfig {
                reason: format!(
                    "min_chars ({}) must be less than max_chars ({})",
                    self.min_chars, self.max_chars
                ),
            }
            .into());
        }
        Ok(())
    }
}

#[derive(Debug)]
enum Block {
    Heading { level: u8, text: String },
    Body(String),
    Code(String),
    Table(String),
}

/// Parses a Markdown filing and chunks it against `config`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid UTF-8, or
/// `config` is inconsistent.
pub fn chunk_file(
    path: &Path,
    config: &ChunkConfig,
    company_name: &str,
    company_code: &str,
    report_period: &str,
) -> Result<Vec<Chunk>> {
    let reader = crate::io::FileReader::open(path)?;
    let bytes = reader.read_to_bytes()?;
    let text = String::from_utf8(bytes).map_err(ChunkingError::from)?;
    let file_path = path.to_string_lossy().to_string();
    chunk_markdown(&text, config, company_name, company_code, report_period, &file_path)
}

/// Parses and chunks a Markdown string already in memory.
///
/// # Errors
///
/// Returns an error if `config` is inconsistent or `report_period` cannot
/// be normalized.
pub fn chunk_markdown(
    text: &str,
    config: &ChunkConfig,
    company_name: &str,
    company_code: &str,
    report_period: &str,
    file_path: &str,
) -> Result<Vec<Chunk>> {
    config.validate()?;
    let report_period = normalize_period(report_period)?;
    let report_id = Chunk::report_id_for(company_code, &report_period);
    let file_path = truncate_bytes(file_path, MAX_FILE_PATH_BYTES);

    let (placeholdered, tables) = extract_tables(text);
    let blocks = parse_blocks(&placeholdered, &tables);

    let mut stack: Vec<(u8, String)> = Vec::new();
    let mut pending: Vec<(Vec<String>, u8, String, String)> = Vec::new();

    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                while stack.last().is_some_and(|(l, _)| *l >= level) {
                    stack.pop();
                }
                stack.push((level, text));
            }
            Block::Table(table_text) => {
                let title_path = current_title_path(&stack);
                let capped = cap_table(&table_text);
                pending.push((title_path, 0, String::new(), capped));
            }
            Block::Body(body) => {
                let title_path = current_title_path(&stack);
                let (title, level) = current_title(&stack);
                for segment in segment_body(&body, config) {
                    let composed = compose_with_headings(&stack, &segment);
                    pending.push((title_path.clone(), level, title.clone(), composed));
                }
            }
            Block::Code(code) => {
                let title_path = current_title_path(&stack);
                let (title, level) = current_title(&stack);
                let composed = compose_with_headings(&stack, &code);
                pending.push((title_path, level, title, composed));
            }
        }
    }

    if pending.is_empty() {
        if stack.is_empty() {
            return Ok(Vec::new());
        }
        let title_path = current_title_path(&stack);
        let (title, level) = current_title(&stack);
        let composed = compose_with_headings(&stack, "");
        pending.push((title_path, level, title, composed));
    }

    let now = now_unix();
    let mut chunks = Vec::with_capacity(pending.len());
    let mut index = 0usize;
    for (title_path, title_level, title, mut text) in pending {
        if text.trim().is_empty() {
            continue;
        }
        text = truncate_bytes(&text, MAX_CHUNK_TEXT_BYTES);
        let chunk_type = classify(&title_path, &text);
        let mut chunk = Chunk {
            chunk_id: Chunk::chunk_id_for(index),
            report_id: report_id.clone(),
            company_name: company_name.to_string(),
            company_code: company_code.to_string(),
            report_period: report_period.clone(),
            title,
            title_level,
            chunk_text: text,
            chunk_type,
            chunk_index: index,
            page_number: -1,
            file_path: file_path.clone(),
            created_at: now,
        };
        chunk.enforce_title_cap();
        chunks.push(chunk);
        index += 1;
    }

    Ok(chunks)
}

fn current_title_path(stack: &[(u8, String)]) -> Vec<String> {
    stack.iter().map(|(_, t)| t.clone()).collect()
}

fn current_title(stack: &[(u8, String)]) -> (String, u8) {
    stack
        .last()
        .map_or_else(|| (String::new(), 0), |(level, title)| (title.clone(), *level))
}

fn compose_with_headings(stack: &[(u8, String)], body: &str) -> String {
    if stack.is_empty() {
        return body.to_string();
    }
    let headers: Vec<String> = stack
        .iter()
        .map(|(level, title)| format!("{} {title}", "#".repeat(*level as usize)))
        .collect();
    if body.is_empty() {
        headers.join("\n")
    } else {
        format!("{}\n\n{body}", headers.join("\n"))
    }
}

/// Caps a table's persisted text and warns on truncation; tables are
/// atomic and never re-split into multiple chunks.
fn cap_table(table_text: &str) -> String {
    if table_text.len() <= MAX_CHUNK_TEXT_BYTES {
        table_text.to_string()
    } else {
        tracing::warn!(
            original_bytes = table_text.len(),
            cap_bytes = MAX_CHUNK_TEXT_BYTES,
            "table chunk exceeded persisted size cap; truncating"
        );
        truncate_bytes(table_text, MAX_CHUNK_TEXT_BYTES)
    }
}

/// Segments a paragraph/list/quote block into pieces at most
/// `config.max_chars` bytes, merging short trailing/leading pieces.
fn segment_body(body: &str, config: &ChunkConfig) -> Vec<String> {
    if body.len() <= config.max_chars {
        return vec![body.to_string()];
    }

    let sentences = split_sentences(body);
    let packed = pack_sentences(&sentences, config.max_chars);
    merge_short_segments(packed, config.min_chars)
}

/// Splits `text` on the Chinese/ASCII sentence-terminator set, never
/// breaking a terminator that is immediately followed by a digit (to avoid
/// splitting inside a decimal number like "3.5").
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;

    for (i, &(byte_idx, ch)) in chars.iter().enumerate() {
        if !SENTENCE_TERMINATORS.contains(&ch) {
            continue;
        }
        let next_is_digit = chars.get(i + 1).is_some_and(|&(_, c)| c.is_ascii_digit());
        if next_is_digit {
            continue;
        }
        let end = byte_idx + ch.len_utf8();
        sentences.push(text[start..end].to_string());
        start = end;
    }
    if start < text.len() {
        sentences.push(text[start..].to_string());
    }
    if sentences.is_empty() {
        sentences.push(text.to_string());
    }
    sentences
}

/// Greedily repacks sentences into segments no longer than `max_chars`
/// bytes. A single sentence already longer than `max_chars` is emitted
/// unsplit.
fn pack_sentences(sentences: &[String], max_chars: usize) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        if sentence.len() > max_chars {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            segments.push(sentence.clone());
            continue;
        }
        if !current.is_empty() && current.len() + sentence.len() > max_chars {
            segments.push(std::mem::take(&mut current));
        }
        current.push_str(sentence);
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Merges segments shorter than `min_chars` into a neighbor: into the
/// preceding segment when one exists, otherwise into the following one.
fn merge_short_segments(segments: Vec<String>, min_chars: usize) -> Vec<String> {
    if segments.len() <= 1 {
        return segments;
    }

    let mut result: Vec<String> = Vec::with_capacity(segments.len());
    for segment in segments {
        if segment.len() < min_chars && !result.is_empty() {
            let last = result.last_mut().expect("checked non-empty above");
            last.push_str(&segment);
        } else {
            result.push(segment);
        }
    }

    while result.len() > 1 && result[0].len() < min_chars {
        let first = result.remove(0);
        result[0] = format!("{first}{}", result[0]);
    }

    result
}

fn table_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<table[^>]*>.*?</table>").expect("table regex is a fixed valid pattern")
    })
}

/// Extracts every `<table>…</table>` span (case-insensitive) into a side
/// table, substituting each with a unique placeholder line so the block
/// parser never has to reason about table markup.
fn extract_tables(text: &str) -> (String, Vec<String>) {
    let re = table_regex();
    let mut tables = Vec::new();
    let mut result = String::with_capacity(text.len());
    let mut last_end = 0usize;

    for m in re.find_iter(text) {
        result.push_str(&text[last_end..m.start()]);
        if !result.is_empty() && !result.ends_with('\n') {
            result.push('\n');
        }
        let idx = tables.len();
        tables.push(m.as_str().to_string());
        result.push_str(&placeholder_line(idx));
        result.push('\n');
        last_end = m.end();
    }
    result.push_str(&text[last_end..]);
    (result, tables)
}

fn placeholder_line(idx: usize) -> String {
    format!("\u{0}TABLE_PLACEHOLDER_{idx}\u{0}")
}

fn parse_placeholder(line: &str) -> Option<usize> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('\u{0}')?.strip_suffix('\u{0}')?;
    inner.strip_prefix("TABLE_PLACEHOLDER_")?.parse().ok()
}

fn parse_heading(line: &str) -> Option<(u8, String)> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('#') {
        return None;
    }
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    Some((level as u8, rest.trim().to_string()))
}

/// Runs the single left-to-right block parsing pass described in the
/// ingestion pipeline's design: blank lines flush the current buffer,
/// code fences suppress every other rule until their matching close.
fn parse_blocks(text: &str, tables: &[String]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut body_buf: Vec<&str> = Vec::new();
    let mut code_buf: Vec<&str> = Vec::new();
    let mut in_code = false;
    let mut fence = "";

    for line in text.lines() {
        if in_code {
            code_buf.push(line);
            if line.trim() == fence {
                blocks.push(Block::Code(code_buf.join("\n")));
                code_buf.clear();
                in_code = false;
            }
            continue;
        }

        let trimmed = line.trim_start();
        if let Some(idx) = parse_placeholder(line) {
            flush_body(&mut body_buf, &mut blocks);
            if let Some(table_text) = tables.get(idx) {
                blocks.push(Block::Table(table_text.clone()));
            }
            continue;
        }

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            flush_body(&mut body_buf, &mut blocks);
            fence = if trimmed.starts_with("```") { "```" } else { "~~~" };
            in_code = true;
            code_buf.push(line);
            continue;
        }

        if let Some((level, title)) = parse_heading(line) {
            flush_body(&mut body_buf, &mut blocks);
            blocks.push(Block::Heading { level, text: title });
            continue;
        }

        if line.trim().is_empty() {
            flush_body(&mut body_buf, &mut blocks);
            continue;
        }

        body_buf.push(line);
    }

    if in_code {
        tracing::warn!("unterminated code fence; treating remainder as a paragraph");
        blocks.push(Block::Body(code_buf.join("\n")));
    } else {
        flush_body(&mut body_buf, &mut blocks);
    }

    blocks
}

fn flush_body(buf: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if !buf.is_empty() {
        blocks.push(Block::Body(buf.join("\n")));
        buf.clear();
    }
}

#[allow(clippy::cast_possible_wrap)]
fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::chunk::ChunkType;

    fn cfg(max_chars: usize, min_chars: usize) -> ChunkConfig {
        ChunkConfig { max_chars, min_chars }
    }

    #[test]
    fn test_dense_chunk_index() {
        let text = "# H1\n\npara one\n\n# H2\n\npara two\n";
        let chunks =
            chunk_markdown(text, &cfg(1000, 10), "Example", "600000", "2024-03-31", "f.md").unwrap();
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
        }
    }

    #[test]
    fn test_heading_inheritance() {
        let text = "# Top\n\n## Child\n\nbody text\n";
        let chunks =
            chunk_markdown(text, &cfg(1000, 10), "Example", "600000", "2024-03-31", "f.md").unwrap();
        let last = chunks.last().unwrap();
        assert_eq!(last.title, "Child");
        assert_eq!(last.title_level, 2);
        assert!(last.chunk_text.contains("# Top"));
        assert!(last.chunk_text.contains("## Child"));
    }

    #[test]
    fn test_table_atomicity_scenario() {
        let text = "# H1\n\ntext\n\n<table><tr><td>a</td></tr><tr><td>b</td></tr></table>\n\nmore text\n";
        let chunks =
            chunk_markdown(text, &cfg(200, 10), "Example", "600000", "2024-03-31", "f.md").unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].chunk_type, ChunkType::Table);
        assert!(chunks[1].chunk_text.starts_with("<table>"));
        assert!(!chunks[1].chunk_text.contains("# H1"));
    }

    #[test]
    fn test_degenerate_headings_only() {
        let text = "# Only\n\n## A Heading\n";
        let chunks =
            chunk_markdown(text, &cfg(1000, 10), "Example", "600000", "2024-03-31", "f.md").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Other);
    }

    #[test]
    fn test_zero_headings_has_level_zero() {
        let text = "just a paragraph with no heading\n";
        let chunks =
            chunk_markdown(text, &cfg(1000, 10), "Example", "600000", "2024-03-31", "f.md").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].title_level, 0);
        assert_eq!(chunks[0].title, "");
    }

    #[test]
    fn test_code_fence_not_split() {
        let code = "```rust\nfn main() {}\n```";
        let text = format!("# H\n\n{code}\n");
        let chunks =
            chunk_markdown(&text, &cfg(5, 1), "Example", "600000", "2024-03-31", "f.md").unwrap();
        let joined: String = chunks.iter().map(|c| c.chunk_text.clone()).collect();
        assert!(joined.contains("fn main() {}"));
    }

    #[test]
    fn test_unterminated_code_fence_is_warning_not_error() {
        let text = "# H\n\n```rust\nfn main() {\n";
        let result = chunk_markdown(text, &cfg(1000, 10), "Example", "600000", "2024-03-31", "f.md");
        assert!(result.is_ok());
    }

    #[test]
    fn test_period_accepts_compact_form() {
        let text = "para\n";
        let chunks =
            chunk_markdown(text, &cfg(1000, 10), "Example", "600000", "20240331", "f.md").unwrap();
        assert_eq!(chunks[0].report_period, "2024-03-31");
    }

    #[test]
    fn test_min_ge_max_is_invalid_config() {
        let result = chunk_markdown("x", &cfg(10, 10), "Example", "600000", "2024-03-31", "f.md");
        assert!(result.is_err());
    }

    #[test]
    fn test_split_sentences_guards_decimal_point() {
        let sentences = split_sentences("Revenue grew 3.5 percent. Costs fell.");
        assert!(sentences.iter().any(|s| s.contains("3.5")));
    }

    #[test]
    fn test_split_sentences_chinese_terminators() {
        let sentences = split_sentences("第一句。第二句！第三句？");
        assert_eq!(sentences.len(), 3);
    }

    #[test]
    fn test_empty_file_yields_no_chunks() {
        let chunks = chunk_markdown("", &cfg(1000, 10), "Example", "600000", "2024-03-31", "f.md").unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_boundary_exactly_max_chars_one_chunk() {
        let body = "a".repeat(100);
        let text = format!("# H\n\n{body}\n");
        let chunks = chunk_markdown(&text, &cfg(100, 10), "Example", "600000", "2024-03-31", "f.md").unwrap();
        assert_eq!(chunks.len(), 1);
    }
}
