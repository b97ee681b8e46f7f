//! Workflow node implementations (C8).
//!
//! Each node is a plain async function: it reads an immutable
//! [`WorkflowState`] snapshot, talks to at most one collaborator, and
//! returns a [`StatePatch`]. A node never propagates an error out of the
//! engine — failures are recorded onto the patch's `errors`/`warnings` and
//! the DAG keeps moving, mirroring how the report should still finish (with
//! gaps noted) rather than abort on a single missing data point.

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

use crate::financial::{FinancialDataClient, FinancialStatement};
use crate::indicators::{calculator, IndicatorSet, IndicatorValue};
use crate::registry::{IndicatorKey, IndustryProfile};
use crate::prompt::PromptSet;
use crate::retriever::Retriever;
use crate::workflow::llm::LlmClient;
use crate::workflow::state::{StatePatch, WorkflowState};

/// Fetches the current and, when available, comparison period's three
/// statements from the financial-data service.
pub async fn fetch_financial_data(state: &WorkflowState, client: &FinancialDataClient) -> StatePatch {
    let mut patch = StatePatch::for_step("fetch_financial_data");

    match client
        .complete_financial_data(&state.company_code, &state.report_period, &state.report_type)
        .await
    {
        Ok(bundle) => {
            patch.income_statement = Some(bundle.income_statement);
            patch.balance_sheet = Some(bundle.balance_sheet);
            patch.cash_flow = Some(bundle.cash_flow);
            patch.previous_period = bundle.previous_period;
            patch.previous_data = bundle.previous_data;
            patch.tools_called.push("financial_data_client".to_string());
        }
        Err(e) => {
            patch.errors.push(format!(
                "no filing data found for {} at {}: {e}",
                state.company_code, state.report_period
            ));
        }
    }

    patch
}

/// Computes every indicator the company's industry profile assigns,
/// skipping entirely if an earlier node already recorded an error.
pub fn calculate_indicators(state: &WorkflowState, profile: &IndustryProfile) -> StatePatch {
    let mut patch = StatePatch::for_step("calculate_indicators");

    if !state.errors.is_empty() {
        return patch;
    }

    let (Some(income), Some(balance), Some(cash_flow)) =
        (&state.income_statement, &state.balance_sheet, &state.cash_flow)
    else {
        patch.errors.push("missing a financial statement; cannot calculate indicators".to_string());
        return patch;
    };

    let previous_balance = state.previous_data.as_ref().map(|p| &p.balance_sheet);
    let previous_income = state.previous_data.as_ref().map(|p| &p.income_statement);

    let mut set = IndicatorSet::default();
    for assignment in profile.indicators {
        let value = compute_indicator(
            assignment.key,
            income,
            balance,
            cash_flow,
            previous_balance,
            previous_income,
            &state.report_period,
        );
        match assignment.priority {
            crate::indicators::IndicatorPriority::Core => set.core.push(value),
            crate::indicators::IndicatorPriority::Auxiliary => set.auxiliary.push(value),
            crate::indicators::IndicatorPriority::Specific => set.specific.push(value),
        }
    }

    patch.indicators = Some(set);
    patch.tools_called.push("indicator_calculator".to_string());
    patch
}

fn decimal_field(statement: &FinancialStatement, key: &str) -> Option<f64> {
    statement.get(key).and_then(|d| d.to_string().parse::<f64>().ok())
}

#[allow(clippy::too_many_arguments)]
fn compute_indicator(
    key: IndicatorKey,
    income: &FinancialStatement,
    balance: &FinancialStatement,
    cash_flow: &FinancialStatement,
    previous_balance: Option<&FinancialStatement>,
    previous_income: Option<&FinancialStatement>,
    report_period: &str,
) -> IndicatorValue {
    match key {
        IndicatorKey::GrossMargin => calculator::gross_margin(income),
        IndicatorKey::CoreProfitMargin => calculator::core_profit_margin(income),
        IndicatorKey::ReturnOnTotalAssets => {
            calculator::return_on_total_assets(income, balance, previous_balance, report_period)
        }
        IndicatorKey::ReturnOnEquity => {
            calculator::return_on_equity(income, balance, previous_balance, report_period)
        }
        IndicatorKey::InventoryTurnover => {
            calculator::inventory_turnover(income, balance, previous_balance, report_period)
        }
        IndicatorKey::FixedAssetTurnover => {
            calculator::fixed_asset_turnover(income, balance, previous_balance, report_period)
        }
        IndicatorKey::OperatingAssetTurnover => {
            calculator::operating_asset_turnover(income, balance, previous_balance, report_period)
        }
        IndicatorKey::CurrentRatio => calculator::current_ratio(balance),
        IndicatorKey::DebtToAssetRatio => calculator::debt_to_asset_ratio(balance),
        IndicatorKey::FinancialLiabilityRatio => calculator::financial_liability_ratio(balance),
        IndicatorKey::OperatingLiabilityRatio => calculator::operating_liability_ratio(balance),
        IndicatorKey::CoreProfitCashRatio => {
            calculator::core_profit_cash_ratio(income, cash_flow, report_period)
        }
        IndicatorKey::DuPontRoe => calculator::dupont(income, balance, previous_balance, report_period).roe,
        IndicatorKey::RevenueGrowth => calculator::growth_indicator(
            IndicatorKey::RevenueGrowth.display_name(),
            "%",
            decimal_field(income, "revenue"),
            previous_income.and_then(|p| decimal_field(p, "revenue")),
        ),
        IndicatorKey::NetProfitGrowth => calculator::growth_indicator(
            IndicatorKey::NetProfitGrowth.display_name(),
            "%",
            decimal_field(income, "net_profit"),
            previous_income.and_then(|p| decimal_field(p, "net_profit")),
        ),
    }
}

/// Assembles retrieval context for the report-writing nodes. A retrieval
/// failure is a warning, not an error — the report still gets written, just
/// without unstructured-text support.
pub async fn retrieve_context(state: &WorkflowState, retriever: &Retriever) -> StatePatch {
    let mut patch = StatePatch::for_step("retrieve_context");

    match retriever.get_context(&state.company_code, &state.report_period, None).await {
        Ok(context) => {
            patch.tools_called.push("retriever".to_string());
            patch.retrieval_context = Some(context);
        }
        Err(e) => {
            patch.warnings.push(format!("failed to retrieve context: {e}"));
            patch.retrieval_context = Some(String::new());
        }
    }

    patch
}

fn format_indicators(indicators: &[IndicatorValue]) -> String {
    indicators
        .iter()
        .map(|indicator| {
            if !indicator.available {
                format!(
                    "- {}: unavailable ({})",
                    indicator.name,
                    indicator.unavailable_reason.as_deref().unwrap_or("no data")
                )
            } else {
                let value = indicator.value.unwrap_or(0.0);
                match indicator.growth_rate {
                    Some(growth) => format!(
                        "- {}: {value:.2}{} (growth {growth:+.2}%)",
                        indicator.name, indicator.unit
                    ),
                    None => format!("- {}: {value:.2}{}", indicator.name, indicator.unit),
                }
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes the core-indicator analysis section.
pub async fn analyze_core_indicators(
    state: &WorkflowState,
    llm: &LlmClient,
    prompts: &PromptSet,
    industry: &IndustryProfile,
) -> StatePatch {
    let mut patch = StatePatch::for_step("analyze_core_indicators");

    if state.indicators.core.is_empty() {
        patch.core_analysis = Some("core indicator data is missing; unable to analyze".to_string());
        return patch;
    }

    let indicators_text = format_indicators(&state.indicators.core);
    let system = prompts.render_system(industry);
    let user = prompts.render_core(&indicators_text, &state.retrieval_context);

    match llm.complete(&system, &user).await {
        Ok(text) => {
            patch.core_analysis = Some(text);
            patch.llm_calls_delta = 1;
        }
        Err(e) => {
            patch.errors.push(format!("core indicator analysis failed: {e}"));
            patch.core_analysis = Some("analysis failed".to_string());
        }
    }

    patch
}

/// Writes the auxiliary-indicator analysis section.
pub async fn analyze_auxiliary_indicators(
    state: &WorkflowState,
    llm: &LlmClient,
    prompts: &PromptSet,
    industry: &IndustryProfile,
) -> StatePatch {
    let mut patch = StatePatch::for_step("analyze_auxiliary_indicators");

    if state.indicators.auxiliary.is_empty() {
        patch.auxiliary_analysis = Some("auxiliary indicator data is missing; unable to analyze".to_string());
        return patch;
    }

    let indicators_text = format_indicators(&state.indicators.auxiliary);
    let system = prompts.render_system(industry);
    let user = prompts.render_auxiliary(&indicators_text);

    match llm.complete(&system, &user).await {
        Ok(text) => {
            patch.auxiliary_analysis = Some(text);
            patch.llm_calls_delta = 1;
        }
        Err(e) => {
            patch.errors.push(format!("auxiliary indicator analysis failed: {e}"));
            patch.auxiliary_analysis = Some("analysis failed".to_string());
        }
    }

    patch
}

/// Writes the industry-specific analysis section. Having no
/// industry-specific indicators is expected for the general profile, not an
/// error.
pub async fn analyze_specific_indicators(
    state: &WorkflowState,
    llm: &LlmClient,
    prompts: &PromptSet,
    industry: &IndustryProfile,
) -> StatePatch {
    let mut patch = StatePatch::for_step("analyze_specific_indicators");

    if state.indicators.specific.is_empty() {
        patch.specific_analysis = Some("no applicable industry-specific indicators".to_string());
        return patch;
    }

    let indicators_text = format_indicators(&state.indicators.specific);
    let system = prompts.render_system(industry);
    let user = prompts.render_specific(industry, &indicators_text);

    match llm.complete(&system, &user).await {
        Ok(text) => {
            patch.specific_analysis = Some(text);
            patch.llm_calls_delta = 1;
        }
        Err(e) => {
            patch.warnings.push(format!("specific indicator analysis failed: {e}"));
            patch.specific_analysis = Some("analysis failed".to_string());
        }
    }

    patch
}

/// Composes the final report from the three section analyses and the
/// retrieval context.
pub async fn generate_report(
    state: &WorkflowState,
    llm: &LlmClient,
    prompts: &PromptSet,
    industry: &IndustryProfile,
) -> StatePatch {
    let mut patch = StatePatch::for_step("generate_report");

    let system = prompts.render_system(industry);
    let user = prompts.render_final(
        &state.core_analysis,
        &state.auxiliary_analysis,
        &state.specific_analysis,
        &state.retrieval_context,
    );

    match llm.complete(&system, &user).await {
        Ok(text) => {
            patch.final_report = Some(text);
            patch.llm_calls_delta = 1;
        }
        Err(e) => {
            patch.errors.push(format!("report generation failed: {e}"));
            patch.final_report = Some("report generation failed".to_string());
        }
    }

    patch
}

const REQUIRED_SECTIONS: &[&str] = &["核心结论", "分项分析", "综合判断", "投资建议"];
const MIN_REPORT_CHARS: usize = 500;
const MIN_NUMERIC_TOKENS: usize = 5;
const QUALITY_THRESHOLD: f64 = 60.0;
const SHORT_REPORT_PENALTY: f64 = 20.0;
const MISSING_SECTION_PENALTY: f64 = 15.0;
const SPARSE_DATA_PENALTY: f64 = 10.0;

fn numeric_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"\d+\.?\d*%?").unwrap()
    })
}

/// Scores the final report and decides whether it needs regenerating.
///
/// Score starts at 100 and loses points for brevity, missing required
/// section headings, and sparse numeric evidence, clamped to `[0, 100]`.
/// Regeneration is requested when the score falls below
/// [`QUALITY_THRESHOLD`] and fewer than `max_regenerations` passes have run.
pub fn quality_check(state: &WorkflowState, max_regenerations: u32) -> StatePatch {
    let mut patch = StatePatch::for_step("quality_check");

    if state.final_report.is_empty() {
        patch.report_quality_score = Some(0.0);
        patch.should_regenerate = Some(false);
        return patch;
    }

    let mut score = 100.0;

    if state.final_report.chars().count() < MIN_REPORT_CHARS {
        score -= SHORT_REPORT_PENALTY;
    }

    for section in REQUIRED_SECTIONS {
        if !state.final_report.contains(section) {
            score -= MISSING_SECTION_PENALTY;
        }
    }

    let numeric_count = numeric_token_pattern().find_iter(&state.final_report).count();
    if numeric_count < MIN_NUMERIC_TOKENS {
        score -= SPARSE_DATA_PENALTY;
    }

    score = score.max(0.0);
    patch.report_quality_score = Some(score);

    let should_regenerate = score < QUALITY_THRESHOLD && state.regeneration_count < max_regenerations;
    patch.should_regenerate = Some(should_regenerate);
    if should_regenerate {
        patch.regeneration_count_delta = 1;
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0);
    patch.processing_time = Some((now - state.created_at).max(0) as f64);

    patch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_state() -> WorkflowState {
        WorkflowState::new("Acme Co", "000001", "2024-12-31", "general", "A")
    }

    #[test]
    fn test_calculate_indicators_skips_when_prior_errors_present() {
        let mut state = base_state();
        state.errors.push("earlier failure".to_string());
        let profile = crate::registry::lookup("general").unwrap();
        let patch = calculate_indicators(&state, profile);
        assert!(patch.indicators.is_none());
    }

    #[test]
    fn test_calculate_indicators_errors_on_missing_statements() {
        let state = base_state();
        let profile = crate::registry::lookup("general").unwrap();
        let patch = calculate_indicators(&state, profile);
        assert!(!patch.errors.is_empty());
    }

    #[test]
    fn test_quality_check_zero_score_on_empty_report() {
        let state = base_state();
        let patch = quality_check(&state, 2);
        assert_eq!(patch.report_quality_score, Some(0.0));
        assert_eq!(patch.should_regenerate, Some(false));
    }

    #[test]
    fn test_quality_check_penalizes_missing_sections_and_requests_regeneration() {
        let mut state = base_state();
        state.final_report = "短".repeat(600);
        let patch = quality_check(&state, 2);
        let score = patch.report_quality_score.unwrap();
        assert!(score < QUALITY_THRESHOLD);
        assert_eq!(patch.should_regenerate, Some(true));
        assert_eq!(patch.regeneration_count_delta, 1);
    }

    #[test]
    fn test_quality_check_passes_well_formed_report() {
        let mut state = base_state();
        let mut report = String::new();
        report.push_str("核心结论: 营收100.00万元, 增长12.50%\n");
        report.push_str("分项分析: 毛利率30.00%, 净利率10.00%\n");
        report.push_str("综合判断: 总资产500.00万元\n");
        report.push_str("投资建议: 建议关注, 目标价20.00元\n");
        report.push_str(&"补充说明文字。".repeat(80));
        state.final_report = report;
        let patch = quality_check(&state, 2);
        let score = patch.report_quality_score.unwrap();
        assert!(score >= QUALITY_THRESHOLD, "score was {score}");
        assert_eq!(patch.should_regenerate, Some(false));
    }

    #[test]
    fn test_quality_check_stops_regenerating_after_limit() {
        let mut state = base_state();
        state.regeneration_count = 2;
        state.final_report = "too short".to_string();
        let patch = quality_check(&state, 2);
        assert_eq!(patch.should_regenerate, Some(false));
    }

    #[test]
    fn test_format_indicators_marks_unavailable() {
        let indicators = vec![IndicatorValue::unavailable("毛利率", "%", "x/y", "missing cost")];
        let text = format_indicators(&indicators);
        assert!(text.contains("unavailable"));
        assert!(text.contains("missing cost"));
    }
}
