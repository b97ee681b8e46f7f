//! Command dispatch and handlers.
//!
//! Each handler builds only the collaborators it needs, runs one
//! operation end to end, and formats the result through
//! [`crate::cli::output`].

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::chunking::{chunk_file, ChunkConfig};
use crate::cli::output::{
    format_chunks, format_indicators, format_ingest_result, format_report_result, IngestResult,
    ReportResult,
};
use crate::cli::parser::{Cli, Commands};
use crate::config::Config;
use crate::embedding::{Embedder, HttpEmbedder};
use crate::error::{CommandError, Result};
use crate::registry;
use crate::retriever::Retriever;
use crate::vectorstore::VectorStore;
use crate::workflow::{Engine, LlmClient, WorkflowState};

/// Runs whichever subcommand `cli` selects, returning the text to print.
///
/// # Errors
///
/// Returns an error from configuration loading, the selected command's
/// collaborators, or the command itself.
pub async fn execute(cli: &Cli) -> Result<String> {
    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::IngestMarkdown { path, company, code, period } => {
            cmd_ingest_markdown(cli, &config, path, company, code, period).await
        }
        Commands::ChunkMarkdown { input, output, company, code, period, max_chunk, min_chunk } => {
            cmd_chunk_markdown(cli, input, output, company, code, period, *max_chunk, *min_chunk)
        }
        Commands::Ratios { stock, period, r#type, industry } => {
            cmd_ratios(cli, &config, stock, period, r#type, industry).await
        }
        Commands::GenerateReport { company, code, period, industry, r#type } => {
            cmd_generate_report(cli, &config, company, code, period, industry, r#type).await
        }
    }
}

async fn cmd_ingest_markdown(
    cli: &Cli,
    config: &Config,
    path: &std::path::Path,
    company: &str,
    code: &str,
    period: &str,
) -> Result<String> {
    let chunk_config = ChunkConfig::default();
    let chunks = chunk_file(path, &chunk_config, company, code, period)?;

    let embedder = HttpEmbedder::connect(&config.embedding, config.retry.clone()).await?;
    let texts: Vec<String> = chunks.iter().map(|c| c.chunk_text.clone()).collect();
    let embeddings = embedder.encode(&texts).await?;

    let mut store = VectorStore::open(&config.vector_store.db_path, embedder.dimension())?;
    store.insert(&chunks, &embeddings)?;

    let result = IngestResult {
        report_id: chunks.first().map(|c| c.report_id.clone()).unwrap_or_default(),
        company_code: code.to_string(),
        report_period: chunks.first().map(|c| c.report_period.clone()).unwrap_or_else(|| period.to_string()),
        chunks_inserted: chunks.len(),
    };
    Ok(format_ingest_result(&result, cli.format))
}

fn cmd_chunk_markdown(
    cli: &Cli,
    input: &std::path::Path,
    output: &std::path::Path,
    company: &str,
    code: &str,
    period: &str,
    max_chunk: usize,
    min_chunk: usize,
) -> Result<String> {
    let chunk_config = ChunkConfig { max_chars: max_chunk, min_chars: min_chunk };
    let chunks = chunk_file(input, &chunk_config, company, code, period)?;

    let json = serde_json::to_string_pretty(&chunks)
        .map_err(|e| CommandError::ExecutionFailed(format!("failed to serialize chunks: {e}")))?;
    crate::io::write_file(output, &json)?;

    Ok(format_chunks(&chunks, cli.format))
}

async fn cmd_ratios(
    cli: &Cli,
    config: &Config,
    stock: &str,
    period: &str,
    report_type: &str,
    industry: &str,
) -> Result<String> {
    let profile = registry::lookup(industry)?;
    let financial_client = crate::financial::FinancialDataClient::new(&config.financial_data, config.retry.clone())?;
    let bundle = financial_client.complete_financial_data(stock, period, report_type).await?;

    let mut state = WorkflowState::new(stock, stock, &bundle.report_period, industry, report_type);
    state.income_statement = Some(bundle.income_statement);
    state.balance_sheet = Some(bundle.balance_sheet);
    state.cash_flow = Some(bundle.cash_flow);
    state.previous_period = bundle.previous_period;
    state.previous_data = bundle.previous_data;

    let patch = crate::workflow::nodes::calculate_indicators(&state, profile);
    state.apply(patch);

    let all: Vec<_> = state.indicators.all().cloned().collect();
    Ok(format_indicators(&all, cli.format))
}

async fn cmd_generate_report(
    cli: &Cli,
    config: &Config,
    company: &str,
    code: &str,
    period: &str,
    industry: &str,
    report_type: &str,
) -> Result<String> {
    registry::lookup(industry)?;

    let financial_client = crate::financial::FinancialDataClient::new(&config.financial_data, config.retry.clone())?;
    let embedder = HttpEmbedder::connect(&config.embedding, config.retry.clone()).await?;
    let store = VectorStore::open(&config.vector_store.db_path, embedder.dimension())?;
    let retriever = Retriever::new(Arc::new(Mutex::new(store)), Arc::new(embedder));
    let llm = LlmClient::new(&config.llm, config.retry.clone())?;
    let prompts = crate::prompt::PromptSet::load(None);

    let engine = Engine::new(financial_client, retriever, llm, prompts, config.max_regenerations);
    let state = WorkflowState::new(company, code, period, industry, report_type);

    let cancellation = CancellationToken::new();
    let final_state = engine.run(state, &cancellation).await?;

    let result = ReportResult::from_state(&final_state);
    Ok(format_report_result(&result, cli.format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn test_execute_rejects_unknown_industry_for_ratios() {
        let cli = Cli::parse_from([
            "finreport-rs",
            "ratios",
            "--stock",
            "000001",
            "--period",
            "2024-03-31",
            "--industry",
            "not-an-industry",
        ]);
        let result = execute(&cli).await;
        assert!(result.is_err());
    }
}
