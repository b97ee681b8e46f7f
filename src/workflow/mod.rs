//! Report-generation workflow engine (C7).
//!
//! Runs the fixed DAG `fetch_financial_data → calculate_indicators →
//! retrieve_context → analyze_core → analyze_auxiliary → analyze_specific →
//! generate_report → quality_check`, with a single back-edge from
//! `quality_check` to `generate_report` bounded by `max_regenerations`.
//! Nodes never mutate state directly; the engine applies each node's
//! [`state::StatePatch`] after it returns.

pub mod llm;
pub mod nodes;
pub mod state;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, WorkflowError};
use crate::financial::FinancialDataClient;
use crate::prompt::PromptSet;
use crate::registry;
use crate::retriever::Retriever;

pub use llm::LlmClient;
pub use state::{StatePatch, WorkflowState};

/// Owns every collaborator a report run needs and drives one DAG execution.
pub struct Engine {
    financial_client: FinancialDataClient,
    retriever: Retriever,
    llm: LlmClient,
    prompts: PromptSet,
    max_regenerations: u32,
}

impl Engine {
    /// Builds an engine from its collaborators.
    #[must_use]
    pub fn new(
        financial_client: FinancialDataClient,
        retriever: Retriever,
        llm: LlmClient,
        prompts: PromptSet,
        max_regenerations: u32,
    ) -> Self {
        Self {
            financial_client,
            retriever,
            llm,
            prompts,
            max_regenerations,
        }
    }

    /// Runs the full DAG for `state`, returning the final state (including
    /// the completed report) once `quality_check` stops requesting
    /// regeneration.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::UnknownIndustry`] if `state.industry` does
    /// not resolve, or [`WorkflowError::Cancelled`] if `cancellation` fires
    /// before the run completes. Per-node upstream failures do not
    /// propagate here — they are recorded onto `state.errors`/`warnings`
    /// and the run continues.
    pub async fn run(&self, mut state: WorkflowState, cancellation: &CancellationToken) -> Result<WorkflowState> {
        let industry = registry::lookup(&state.industry)?;

        macro_rules! checkpoint {
            ($name:expr) => {
                if cancellation.is_cancelled() {
                    tracing::info!(node = $name, report = %state.company_code, "workflow cancelled");
                    return Err(WorkflowError::Cancelled.into());
                }
            };
        }

        {
            let _span = tracing::info_span!("node", name = "fetch_financial_data", company = %state.company_code).entered();
            state.apply(nodes::fetch_financial_data(&state, &self.financial_client).await);
        }
        checkpoint!("fetch_financial_data");

        {
            let _span = tracing::info_span!("node", name = "calculate_indicators").entered();
            state.apply(nodes::calculate_indicators(&state, industry));
        }
        checkpoint!("calculate_indicators");

        {
            let _span = tracing::info_span!("node", name = "retrieve_context").entered();
            state.apply(nodes::retrieve_context(&state, &self.retriever).await);
        }
        checkpoint!("retrieve_context");

        {
            let _span = tracing::info_span!("node", name = "analyze_core_indicators").entered();
            state.apply(nodes::analyze_core_indicators(&state, &self.llm, &self.prompts, industry).await);
        }
        checkpoint!("analyze_core_indicators");

        {
            let _span = tracing::info_span!("node", name = "analyze_auxiliary_indicators").entered();
            state.apply(nodes::analyze_auxiliary_indicators(&state, &self.llm, &self.prompts, industry).await);
        }
        checkpoint!("analyze_auxiliary_indicators");

        {
            let _span = tracing::info_span!("node", name = "analyze_specific_indicators").entered();
            state.apply(nodes::analyze_specific_indicators(&state, &self.llm, &self.prompts, industry).await);
        }
        checkpoint!("analyze_specific_indicators");

        loop {
            {
                let _span = tracing::info_span!("node", name = "generate_report", regeneration = state.regeneration_count).entered();
                state.apply(nodes::generate_report(&state, &self.llm, &self.prompts, industry).await);
            }
            checkpoint!("generate_report");

            {
                let _span = tracing::info_span!("node", name = "quality_check").entered();
                state.apply(nodes::quality_check(&state, self.max_regenerations));
            }

            if !state.should_regenerate {
                break;
            }
            tracing::warn!(
                score = state.report_quality_score,
                attempt = state.regeneration_count,
                "report quality below threshold, regenerating"
            );
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_run_rejects_unknown_industry() {
        // Smoke-tests the industry lookup guard without standing up real
        // collaborators; full-DAG execution is covered by integration tests.
        let result = registry::lookup("not-an-industry");
        assert!(result.is_err());
    }
}
