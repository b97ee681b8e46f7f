//! Shared workflow state (§3) and the merge-patch mechanism nodes use to
//! update it.
//!
//! Nodes never receive `&mut WorkflowState`: they read an immutable
//! snapshot and return a [`StatePatch`] describing what changed, which the
//! engine applies with [`WorkflowState::apply`]. This keeps every node a
//! plain function of its inputs, easy to test without constructing the
//! whole engine.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::financial::{FinancialStatement, PreviousStatements};
use crate::indicators::IndicatorSet;

/// The full state threaded through the report-generation DAG.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    /// Company display name.
    pub company_name: String,
    /// Stock/company code.
    pub company_code: String,
    /// Normalized `YYYY-MM-DD` report period.
    pub report_period: String,
    /// Industry code, resolved against [`crate::registry`].
    pub industry: String,
    /// Report type, `"A"` or `"B"`.
    pub report_type: String,

    /// Current-period income statement, once fetched.
    pub income_statement: Option<FinancialStatement>,
    /// Current-period balance sheet, once fetched.
    pub balance_sheet: Option<FinancialStatement>,
    /// Current-period cash flow statement, once fetched.
    pub cash_flow: Option<FinancialStatement>,
    /// The prior period used for growth/averages, if found.
    pub previous_period: Option<String>,
    /// The prior period's three statements, if `previous_period` is set.
    pub previous_data: Option<PreviousStatements>,

    /// Computed indicators, bucketed by priority.
    pub indicators: IndicatorSet,

    /// Assembled retrieval context (§4.6), capped and labeled.
    pub retrieval_context: String,

    /// LLM-written core-indicator analysis.
    pub core_analysis: String,
    /// LLM-written auxiliary-indicator analysis.
    pub auxiliary_analysis: String,
    /// LLM-written industry-specific analysis.
    pub specific_analysis: String,

    /// The composed final report text.
    pub final_report: String,
    /// Quality score in `[0, 100]` from the last quality check.
    pub report_quality_score: f64,

    /// Fatal-ish problems recorded by nodes; a non-empty list short-circuits
    /// downstream computation nodes.
    pub errors: Vec<String>,
    /// Non-fatal problems recorded by nodes.
    pub warnings: Vec<String>,
    /// Names of nodes that have run, in order, including repeats from
    /// regeneration.
    pub processing_steps: Vec<String>,
    /// Total LLM calls made so far.
    pub llm_calls: u32,
    /// Names of external tools/clients invoked so far.
    pub tools_called: Vec<String>,

    /// Unix timestamp (seconds) this state was created.
    pub created_at: i64,
    /// Wall-clock seconds from creation to the last quality check.
    pub processing_time: f64,

    /// Name of the node currently (or most recently) executing.
    pub current_step: String,
    /// Set by `quality_check` when the report should be regenerated.
    pub should_regenerate: bool,
    /// How many regeneration passes have run so far.
    pub regeneration_count: u32,
}

impl WorkflowState {
    /// Whether the run completed without recording a fatal error. A report
    /// can still be present when this is `false` (partial success); see the
    /// final-outcome contract.
    #[must_use]
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Builds the zero-value initial state for one report run.
    #[must_use]
    pub fn new(company_name: &str, company_code: &str, report_period: &str, industry: &str, report_type: &str) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or(0);

        Self {
            company_name: company_name.to_string(),
            company_code: company_code.to_string(),
            report_period: report_period.to_string(),
            industry: industry.to_string(),
            report_type: report_type.to_string(),
            income_statement: None,
            balance_sheet: None,
            cash_flow: None,
            previous_period: None,
            previous_data: None,
            indicators: IndicatorSet::default(),
            retrieval_context: String::new(),
            core_analysis: String::new(),
            auxiliary_analysis: String::new(),
            specific_analysis: String::new(),
            final_report: String::new(),
            report_quality_score: 0.0,
            errors: Vec::new(),
            warnings: Vec::new(),
            processing_steps: Vec::new(),
            llm_calls: 0,
            tools_called: Vec::new(),
            created_at,
            processing_time: 0.0,
            current_step: String::new(),
            should_regenerate: false,
            regeneration_count: 0,
        }
    }

    /// Applies a node's patch to this state. Append-only fields (errors,
    /// warnings, tools called) are extended, not replaced; every other
    /// field in the patch, if present, overwrites the current value.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(step) = patch.current_step {
            self.processing_steps.push(step.clone());
            self.current_step = step;
        }
        if let Some(v) = patch.income_statement {
            self.income_statement = Some(v);
        }
        if let Some(v) = patch.balance_sheet {
            self.balance_sheet = Some(v);
        }
        if let Some(v) = patch.cash_flow {
            self.cash_flow = Some(v);
        }
        if let Some(v) = patch.previous_period {
            self.previous_period = Some(v);
        }
        if let Some(v) = patch.previous_data {
            self.previous_data = Some(v);
        }
        if let Some(v) = patch.indicators {
            self.indicators = v;
        }
        if let Some(v) = patch.retrieval_context {
            self.retrieval_context = v;
        }
        if let Some(v) = patch.core_analysis {
            self.core_analysis = v;
        }
        if let Some(v) = patch.auxiliary_analysis {
            self.auxiliary_analysis = v;
        }
        if let Some(v) = patch.specific_analysis {
            self.specific_analysis = v;
        }
        if let Some(v) = patch.final_report {
            self.final_report = v;
        }
        if let Some(v) = patch.report_quality_score {
            self.report_quality_score = v;
        }
        if let Some(v) = patch.should_regenerate {
            self.should_regenerate = v;
        }
        if let Some(v) = patch.processing_time {
            self.processing_time = v;
        }
        self.errors.extend(patch.errors);
        self.warnings.extend(patch.warnings);
        self.tools_called.extend(patch.tools_called);
        self.llm_calls += patch.llm_calls_delta;
        self.regeneration_count += patch.regeneration_count_delta;
    }
}

/// What one node wants to change. Every field is additive or
/// overwrite-if-present; a node that has nothing to say about a field
/// leaves it at its `Default`.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    /// Name of the node that produced this patch, recorded onto
    /// `processing_steps` and `current_step`.
    pub current_step: Option<String>,
    pub income_statement: Option<FinancialStatement>,
    pub balance_sheet: Option<FinancialStatement>,
    pub cash_flow: Option<FinancialStatement>,
    pub previous_period: Option<String>,
    pub previous_data: Option<PreviousStatements>,
    pub indicators: Option<IndicatorSet>,
    pub retrieval_context: Option<String>,
    pub core_analysis: Option<String>,
    pub auxiliary_analysis: Option<String>,
    pub specific_analysis: Option<String>,
    pub final_report: Option<String>,
    pub report_quality_score: Option<f64>,
    pub should_regenerate: Option<bool>,
    pub processing_time: Option<f64>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub tools_called: Vec<String>,
    pub llm_calls_delta: u32,
    pub regeneration_count_delta: u32,
}

impl StatePatch {
    /// Starts a patch tagged with the node name that produced it.
    #[must_use]
    pub fn for_step(step: &str) -> Self {
        Self {
            current_step: Some(step.to_string()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_zero_valued() {
        let state = WorkflowState::new("Acme", "000001", "2024-12-31", "general", "A");
        assert!(state.errors.is_empty());
        assert_eq!(state.llm_calls, 0);
        assert_eq!(state.regeneration_count, 0);
        assert!(state.income_statement.is_none());
    }

    #[test]
    fn test_apply_appends_errors_and_records_step() {
        let mut state = WorkflowState::new("Acme", "000001", "2024-12-31", "general", "A");
        let mut patch = StatePatch::for_step("fetch_financial_data");
        patch.errors.push("not found".to_string());
        state.apply(patch);
        assert_eq!(state.current_step, "fetch_financial_data");
        assert_eq!(state.processing_steps, vec!["fetch_financial_data"]);
        assert_eq!(state.errors, vec!["not found".to_string()]);
    }

    #[test]
    fn test_apply_increments_llm_calls() {
        let mut state = WorkflowState::new("Acme", "000001", "2024-12-31", "general", "A");
        let mut patch = StatePatch::for_step("analyze_core_indicators");
        patch.llm_calls_delta = 1;
        patch.core_analysis = Some("analysis text".to_string());
        state.apply(patch);
        assert_eq!(state.llm_calls, 1);
        assert_eq!(state.core_analysis, "analysis text");
    }

    #[test]
    fn test_apply_overwrites_final_report_not_accumulates() {
        let mut state = WorkflowState::new("Acme", "000001", "2024-12-31", "general", "A");
        state.apply(StatePatch {
            final_report: Some("first draft".to_string()),
            ..StatePatch::for_step("generate_report")
        });
        state.apply(StatePatch {
            final_report: Some("second draft".to_string()),
            ..StatePatch::for_step("generate_report")
        });
        assert_eq!(state.final_report, "second draft");
        assert_eq!(state.processing_steps.len(), 2);
    }
}
