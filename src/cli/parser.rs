//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// finreport-rs: turns earnings filings into structured financial reports.
#[derive(Parser, Debug)]
#[command(name = "finreport-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a TOML configuration file, overriding `RLM_CONFIG`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// How command output is rendered.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// A single JSON document.
    Json,
    /// Newline-delimited JSON, one record per line.
    Ndjson,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk a Markdown filing and persist it into the vector store.
    IngestMarkdown {
        /// Path to the Markdown filing.
        #[arg(long)]
        path: PathBuf,

        /// Company display name.
        #[arg(long)]
        company: String,

        /// Company stock code.
        #[arg(long)]
        code: String,

        /// Report period (`YYYY-MM-DD` or `YYYYMMDD`).
        #[arg(long)]
        period: String,
    },

    /// Chunk a Markdown filing and write the chunks to a file, without
    /// touching the vector store.
    ChunkMarkdown {
        /// Path to the input Markdown file.
        #[arg(long)]
        input: PathBuf,

        /// Path to write the chunked output to.
        #[arg(long)]
        output: PathBuf,

        /// Company display name.
        #[arg(long, default_value = "")]
        company: String,

        /// Company stock code.
        #[arg(long, default_value = "")]
        code: String,

        /// Report period (`YYYY-MM-DD` or `YYYYMMDD`).
        #[arg(long, default_value = "")]
        period: String,

        /// Upper bound on a single chunk, in bytes.
        #[arg(long, default_value = "1200")]
        max_chunk: usize,

        /// Minimum chunk size, in bytes, before merging into a neighbor.
        #[arg(long, default_value = "200")]
        min_chunk: usize,
    },

    /// Calculate financial ratios for one stock and period.
    Ratios {
        /// Stock code.
        #[arg(long)]
        stock: String,

        /// Report period (`YYYY-MM-DD` or `YYYYMMDD`).
        #[arg(long)]
        period: String,

        /// Report type.
        #[arg(long, default_value = "A")]
        r#type: String,

        /// Industry code used to select which indicators to report.
        #[arg(long, default_value = "general")]
        industry: String,
    },

    /// Run the full report-generation workflow for one company/period.
    GenerateReport {
        /// Company display name.
        #[arg(long)]
        company: String,

        /// Company stock code.
        #[arg(long)]
        code: String,

        /// Report period (`YYYY-MM-DD` or `YYYYMMDD`).
        #[arg(long)]
        period: String,

        /// Industry code, resolved against the industry registry.
        #[arg(long)]
        industry: String,

        /// Report type.
        #[arg(long, default_value = "A")]
        r#type: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_ratios_command() {
        let cli = Cli::parse_from([
            "finreport-rs",
            "ratios",
            "--stock",
            "000001",
            "--period",
            "2024-03-31",
        ]);
        match cli.command {
            Commands::Ratios { stock, period, .. } => {
                assert_eq!(stock, "000001");
                assert_eq!(period, "2024-03-31");
            }
            _ => panic!("expected Ratios command"),
        }
    }

    #[test]
    fn test_default_format_is_text() {
        let cli = Cli::parse_from([
            "finreport-rs",
            "ratios",
            "--stock",
            "000001",
            "--period",
            "2024-03-31",
        ]);
        assert_eq!(cli.format, OutputFormat::Text);
    }
}
