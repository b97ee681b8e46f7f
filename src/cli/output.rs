//! Output formatting for CLI commands.
//!
//! Supports text, JSON, and NDJSON output.

use std::fmt::Write;

use serde::Serialize;

use crate::chunking::Chunk;
use crate::cli::parser::OutputFormat;
use crate::error::Error;
use crate::indicators::IndicatorValue;
use crate::workflow::WorkflowState;

fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    error: String,
    kind: &'static str,
}

fn kind_label(kind: crate::error::ErrorKind) -> &'static str {
    use crate::error::ErrorKind;
    match kind {
        ErrorKind::NotFound => "not_found",
        ErrorKind::TransientUpstream => "transient_upstream",
        ErrorKind::PermanentUpstream => "permanent_upstream",
        ErrorKind::Precondition => "precondition",
        ErrorKind::InvalidInput => "invalid_input",
        ErrorKind::Cancelled => "cancelled",
        ErrorKind::Internal => "internal",
    }
}

/// Formats a top-level error for CLI output, in the requested format.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("error: {error}"),
        OutputFormat::Json | OutputFormat::Ndjson => format_json(&ErrorPayload {
            error: error.to_string(),
            kind: kind_label(error.kind()),
        }),
    }
}

/// Outcome of `ingest-markdown`.
#[derive(Debug, Serialize)]
pub struct IngestResult {
    /// The derived report id chunks were stored under.
    pub report_id: String,
    /// Company stock code.
    pub company_code: String,
    /// Normalized report period.
    pub report_period: String,
    /// Number of chunks produced and inserted.
    pub chunks_inserted: usize,
}

/// Formats an [`IngestResult`].
#[must_use]
pub fn format_ingest_result(result: &IngestResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            let _ = writeln!(out, "ingested {} ({})", result.report_id, result.company_code);
            let _ = writeln!(out, "  period:  {}", result.report_period);
            let _ = writeln!(out, "  chunks:  {}", result.chunks_inserted);
            out
        }
        OutputFormat::Json | OutputFormat::Ndjson => format_json(result),
    }
}

/// Formats the chunk list produced by `chunk-markdown`.
#[must_use]
pub fn format_chunks(chunks: &[Chunk], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for chunk in chunks {
                let _ = writeln!(
                    out,
                    "[{}] {} ({}, {} bytes)",
                    chunk.chunk_index,
                    chunk.chunk_id,
                    chunk.chunk_type,
                    chunk.chunk_text.len()
                );
            }
            out
        }
        OutputFormat::Json => format_json(chunks),
        OutputFormat::Ndjson => chunks
            .iter()
            .map(format_json)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Formats the indicator list produced by `ratios`.
#[must_use]
pub fn format_indicators(indicators: &[IndicatorValue], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for indicator in indicators {
                if indicator.available {
                    let value = indicator.value.unwrap_or(0.0);
                    let _ = write!(out, "  {:<20} {value:>10.2}{}", indicator.name, indicator.unit);
                    if let Some(growth) = indicator.growth_rate {
                        let _ = write!(out, "  (growth {growth:+.2}%)");
                    }
                    if indicator.approximate {
                        let _ = write!(out, "  [approximate]");
                    }
                    let _ = writeln!(out);
                } else {
                    let _ = writeln!(
                        out,
                        "  {:<20} {:>10}  ({})",
                        indicator.name,
                        "N/A",
                        indicator.unavailable_reason.as_deref().unwrap_or("no data")
                    );
                }
            }
            out
        }
        OutputFormat::Json => format_json(indicators),
        OutputFormat::Ndjson => indicators
            .iter()
            .map(format_json)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// The structured final outcome of a `generate-report` run (§7).
#[derive(Debug, Serialize)]
pub struct ReportResult<'a> {
    /// Whether the run completed without recording a fatal error.
    pub success: bool,
    /// The generated report text.
    pub report: &'a str,
    /// Overall quality score from the last quality check.
    pub quality_score: f64,
    /// Wall-clock seconds from state creation to the last quality check.
    pub processing_time: f64,
    /// Total LLM calls made across the run.
    pub llm_calls: u32,
    /// Names of external tools/clients invoked.
    pub tools_called: &'a [String],
    /// Node names executed, in order.
    pub processing_steps: &'a [String],
    /// Fatal errors recorded during the run.
    pub errors: &'a [String],
    /// Non-fatal warnings recorded during the run.
    pub warnings: &'a [String],
}

impl<'a> ReportResult<'a> {
    /// Builds a result view over a finished workflow state.
    #[must_use]
    pub fn from_state(state: &'a WorkflowState) -> Self {
        Self {
            success: state.success(),
            report: &state.final_report,
            quality_score: state.report_quality_score,
            processing_time: state.processing_time,
            llm_calls: state.llm_calls,
            tools_called: &state.tools_called,
            processing_steps: &state.processing_steps,
            errors: &state.errors,
            warnings: &state.warnings,
        }
    }
}

/// Formats a [`ReportResult`].
#[must_use]
pub fn format_report_result(result: &ReportResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "status: {}  quality: {:.1}  llm calls: {}",
                if result.success { "success" } else { "partial" },
                result.quality_score,
                result.llm_calls
            );
            if !result.errors.is_empty() {
                let _ = writeln!(out, "errors:");
                for error in result.errors {
                    let _ = writeln!(out, "  - {error}");
                }
            }
            if !result.warnings.is_empty() {
                let _ = writeln!(out, "warnings:");
                for warning in result.warnings {
                    let _ = writeln!(out, "  - {warning}");
                }
            }
            let _ = writeln!(out);
            out.push_str(result.report);
            out
        }
        OutputFormat::Json | OutputFormat::Ndjson => format_json(result),
    }
}
