//! Pure financial ratio calculations (C5).
//!
//! No I/O. Every function null-propagates: a missing operand yields an
//! unavailable indicator rather than a panic or a zero.

use rust_decimal::Decimal;

use crate::financial::FinancialStatement;
use crate::indicators::types::IndicatorValue;
use crate::period::annualization_factor;

fn to_f64(value: Decimal) -> f64 {
    value.to_string().parse().unwrap_or(f64::NAN)
}

/// Divides `numerator` by `denominator`, returning `None` on a zero or
/// otherwise non-finite denominator.
fn safe_div(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return None;
    }
    let result = numerator / denominator;
    result.is_finite().then_some(result)
}

/// Growth rate in percent: `(current - previous) / |previous| * 100`.
/// `None` when either operand is missing or `previous` is zero or
/// negative (per spec, growth on a non-positive base is undefined, not
/// ±∞).
#[must_use]
pub fn growth_rate(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let current = current?;
    let previous = previous?;
    if previous <= 0.0 {
        return None;
    }
    Some(round2(((current - previous) / previous.abs()) * 100.0))
}

/// Mean of `current` and `prior`; falls back to `current` unchanged when
/// `prior` is absent.
fn average(current: f64, prior: Option<f64>) -> f64 {
    prior.map_or(current, |p| (current + p) / 2.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn field(statement: &FinancialStatement, key: &str) -> Option<f64> {
    statement.get(key).map(to_f64)
}

/// `(revenue - cost) / revenue * 100`.
#[must_use]
pub fn gross_margin(income: &FinancialStatement) -> IndicatorValue {
    let revenue = field(income, "revenue");
    let cost = field(income, "cost");
    match (revenue, cost) {
        (Some(revenue), Some(cost)) => safe_div(revenue - cost, revenue).map_or_else(
            || {
                IndicatorValue::unavailable(
                    "毛利率",
                    "%",
                    "(revenue - cost) / revenue * 100",
                    "revenue is zero",
                )
            },
            |margin| {
                IndicatorValue::available(
                    "毛利率",
                    round2(margin * 100.0),
                    "%",
                    "(revenue - cost) / revenue * 100",
                )
            },
        ),
        _ => IndicatorValue::unavailable(
            "毛利率",
            "%",
            "(revenue - cost) / revenue * 100",
            "revenue or cost missing",
        ),
    }
}

/// `(revenue - cost - rd_expense) / revenue * 100`.
#[must_use]
pub fn core_profit_margin(income: &FinancialStatement) -> IndicatorValue {
    let revenue = field(income, "revenue");
    let cost = field(income, "cost");
    let rd = field(income, "rd_expense").unwrap_or(0.0);
    match (revenue, cost) {
        (Some(revenue), Some(cost)) => safe_div(revenue - cost - rd, revenue).map_or_else(
            || {
                IndicatorValue::unavailable(
                    "核心利润率",
                    "%",
                    "(revenue - cost - rd_expense) / revenue * 100",
                    "revenue is zero",
                )
            },
            |margin| {
                IndicatorValue::available(
                    "核心利润率",
                    round2(margin * 100.0),
                    "%",
                    "(revenue - cost - rd_expense) / revenue * 100",
                )
            },
        ),
        _ => IndicatorValue::unavailable(
            "核心利润率",
            "%",
            "(revenue - cost - rd_expense) / revenue * 100",
            "revenue or cost missing",
        ),
    }
}

/// EBIT = `total_profit + interest_expense`, falling back to
/// `finance_expense` (flagged `approximate`) when `interest_expense` is
/// absent. Returns `(ebit, approximate)` or `None` if neither operand is
/// usable.
fn ebit(income: &FinancialStatement) -> Option<(f64, bool)> {
    let total_profit = field(income, "total_profit")?;
    if let Some(interest) = field(income, "interest_expense") {
        return Some((total_profit + interest, false));
    }
    field(income, "finance_expense").map(|finance| (total_profit + finance, true))
}

/// `annualize(EBIT) / avg_total_assets * 100`.
#[must_use]
pub fn return_on_total_assets(
    income: &FinancialStatement,
    balance: &FinancialStatement,
    previous_balance: Option<&FinancialStatement>,
    report_period: &str,
) -> IndicatorValue {
    const NAME: &str = "总资产报酬率(ROA)";
    const FORMULA: &str = "annualize(total_profit + interest_expense) / avg_total_assets * 100";

    let Some((ebit_value, approximate)) = ebit(income) else {
        return IndicatorValue::unavailable(NAME, "%", FORMULA, "total_profit missing");
    };
    let Some(factor) = annualization_factor(report_period).ok() else {
        return IndicatorValue::unavailable(NAME, "%", FORMULA, "invalid report period");
    };
    let Some(total_assets) = field(balance, "total_assets") else {
        return IndicatorValue::unavailable(NAME, "%", FORMULA, "total_assets missing");
    };
    let prior_assets = previous_balance.and_then(|b| field(b, "total_assets"));
    let avg_assets = average(total_assets, prior_assets);

    safe_div(ebit_value * factor, avg_assets).map_or_else(
        || IndicatorValue::unavailable(NAME, "%", FORMULA, "average total assets is zero"),
        |ratio| {
            IndicatorValue::available(NAME, round2(ratio * 100.0), "%", FORMULA)
                .annualized(true)
                .approximate(approximate)
        },
    )
}

/// `annualize(net_profit) / avg_equity * 100`.
#[must_use]
pub fn return_on_equity(
    income: &FinancialStatement,
    balance: &FinancialStatement,
    previous_balance: Option<&FinancialStatement>,
    report_period: &str,
) -> IndicatorValue {
    const NAME: &str = "净资产收益率(ROE)";
    const FORMULA: &str = "annualize(net_profit) / avg_equity * 100";

    let Some(net_profit) = field(income, "net_profit") else {
        return IndicatorValue::unavailable(NAME, "%", FORMULA, "net_profit missing");
    };
    let Ok(factor) = annualization_factor(report_period) else {
        return IndicatorValue::unavailable(NAME, "%", FORMULA, "invalid report period");
    };
    let Some(equity) = field(balance, "total_equity") else {
        return IndicatorValue::unavailable(NAME, "%", FORMULA, "total_equity missing");
    };
    let prior_equity = previous_balance.and_then(|b| field(b, "total_equity"));
    let avg_equity = average(equity, prior_equity);

    safe_div(net_profit * factor, avg_equity).map_or_else(
        || IndicatorValue::unavailable(NAME, "%", FORMULA, "average equity is zero"),
        |ratio| IndicatorValue::available(NAME, round2(ratio * 100.0), "%", FORMULA).annualized(true),
    )
}

/// `annualize(cost) / avg_inventory`.
#[must_use]
pub fn inventory_turnover(
    income: &FinancialStatement,
    balance: &FinancialStatement,
    previous_balance: Option<&FinancialStatement>,
    report_period: &str,
) -> IndicatorValue {
    const NAME: &str = "存货周转率";
    const FORMULA: &str = "annualize(cost) / avg_inventory";

    let Some(cost) = field(income, "cost") else {
        return IndicatorValue::unavailable(NAME, "次", FORMULA, "cost missing");
    };
    let Ok(factor) = annualization_factor(report_period) else {
        return IndicatorValue::unavailable(NAME, "次", FORMULA, "invalid report period");
    };
    let Some(inventory) = field(balance, "inventory") else {
        return IndicatorValue::unavailable(NAME, "次", FORMULA, "inventory missing");
    };
    let prior_inventory = previous_balance.and_then(|b| field(b, "inventory"));
    let avg_inventory = average(inventory, prior_inventory);

    safe_div(cost * factor, avg_inventory).map_or_else(
        || IndicatorValue::unavailable(NAME, "次", FORMULA, "average inventory is zero"),
        |ratio| IndicatorValue::available(NAME, round2(ratio), "次", FORMULA).annualized(true),
    )
}

/// `annualize(revenue) / avg_fixed_assets`.
#[must_use]
pub fn fixed_asset_turnover(
    income: &FinancialStatement,
    balance: &FinancialStatement,
    previous_balance: Option<&FinancialStatement>,
    report_period: &str,
) -> IndicatorValue {
    const NAME: &str = "固定资产周转率";
    const FORMULA: &str = "annualize(revenue) / avg_fixed_assets";

    let Some(revenue) = field(income, "revenue") else {
        return IndicatorValue::unavailable(NAME, "次", FORMULA, "revenue missing");
    };
    let Ok(factor) = annualization_factor(report_period) else {
        return IndicatorValue::unavailable(NAME, "次", FORMULA, "invalid report period");
    };
    let Some(fixed_assets) = field(balance, "fixed_assets") else {
        return IndicatorValue::unavailable(NAME, "次", FORMULA, "fixed_assets missing");
    };
    let prior_fixed = previous_balance.and_then(|b| field(b, "fixed_assets"));
    let avg_fixed = average(fixed_assets, prior_fixed);

    safe_div(revenue * factor, avg_fixed).map_or_else(
        || IndicatorValue::unavailable(NAME, "次", FORMULA, "average fixed assets is zero"),
        |ratio| IndicatorValue::available(NAME, round2(ratio), "次", FORMULA).annualized(true),
    )
}

/// `operating_assets = total_assets - investment_assets`;
/// `annualize(revenue) / avg_operating_assets`.
#[must_use]
pub fn operating_asset_turnover(
    income: &FinancialStatement,
    balance: &FinancialStatement,
    previous_balance: Option<&FinancialStatement>,
    report_period: &str,
) -> IndicatorValue {
    const NAME: &str = "经营性资产周转率";
    const FORMULA: &str = "annualize(revenue) / avg(total_assets - investment_assets)";

    let Some(revenue) = field(income, "revenue") else {
        return IndicatorValue::unavailable(NAME, "次", FORMULA, "revenue missing");
    };
    let Ok(factor) = annualization_factor(report_period) else {
        return IndicatorValue::unavailable(NAME, "次", FORMULA, "invalid report period");
    };
    let Some(total_assets) = field(balance, "total_assets") else {
        return IndicatorValue::unavailable(NAME, "次", FORMULA, "total_assets missing");
    };
    let investment = field(balance, "investment_assets").unwrap_or(0.0);
    let operating_assets = total_assets - investment;

    let prior_operating = previous_balance.and_then(|b| {
        field(b, "total_assets")
            .map(|assets| assets - field(b, "investment_assets").unwrap_or(0.0))
    });
    let avg_operating = average(operating_assets, prior_operating);

    safe_div(revenue * factor, avg_operating).map_or_else(
        || IndicatorValue::unavailable(NAME, "次", FORMULA, "average operating assets is zero"),
        |ratio| IndicatorValue::available(NAME, round2(ratio), "次", FORMULA).annualized(true),
    )
}

/// `current_assets / current_liabilities`.
#[must_use]
pub fn current_ratio(balance: &FinancialStatement) -> IndicatorValue {
    const NAME: &str = "流动比率";
    const FORMULA: &str = "current_assets / current_liabilities";
    let assets = field(balance, "current_assets");
    let liabilities = field(balance, "current_liabilities");
    match (assets, liabilities) {
        (Some(assets), Some(liabilities)) => safe_div(assets, liabilities).map_or_else(
            || IndicatorValue::unavailable(NAME, "", FORMULA, "current_liabilities is zero"),
            |ratio| IndicatorValue::available(NAME, round2(ratio), "", FORMULA),
        ),
        _ => IndicatorValue::unavailable(NAME, "", FORMULA, "current assets or liabilities missing"),
    }
}

/// `total_liabilities / total_assets * 100`.
#[must_use]
pub fn debt_to_asset_ratio(balance: &FinancialStatement) -> IndicatorValue {
    const NAME: &str = "资产负债率";
    const FORMULA: &str = "total_liabilities / total_assets * 100";
    let liabilities = field(balance, "total_liabilities");
    let assets = field(balance, "total_assets");
    match (liabilities, assets) {
        (Some(liabilities), Some(assets)) => safe_div(liabilities, assets).map_or_else(
            || IndicatorValue::unavailable(NAME, "%", FORMULA, "total_assets is zero"),
            |ratio| IndicatorValue::available(NAME, round2(ratio * 100.0), "%", FORMULA),
        ),
        _ => IndicatorValue::unavailable(NAME, "%", FORMULA, "total_liabilities or total_assets missing"),
    }
}

const FINANCIAL_LIABILITY_FIELDS: &[&str] = &[
    "short_term_borrowing",
    "long_term_borrowing",
    "bonds_payable",
    "lease_liability",
    "trading_financial_liability",
    "non_current_liability_due_within_one_year",
];

/// Sum of the six interest-bearing liability fields; `None` if every one
/// is absent.
fn financial_liabilities(balance: &FinancialStatement) -> Option<f64> {
    let present: Vec<f64> = FINANCIAL_LIABILITY_FIELDS
        .iter()
        .filter_map(|key| field(balance, key))
        .collect();
    (!present.is_empty()).then(|| present.iter().sum())
}

/// `Σ(interest-bearing liabilities) / total_liabilities * 100`. Requires
/// at least one interest-bearing field present.
#[must_use]
pub fn financial_liability_ratio(balance: &FinancialStatement) -> IndicatorValue {
    const NAME: &str = "有息负债率";
    const FORMULA: &str = "sum(interest-bearing liabilities) / total_liabilities * 100";
    let Some(financial) = financial_liabilities(balance) else {
        return IndicatorValue::unavailable(NAME, "%", FORMULA, "no interest-bearing liability field present");
    };
    let Some(total) = field(balance, "total_liabilities") else {
        return IndicatorValue::unavailable(NAME, "%", FORMULA, "total_liabilities missing");
    };
    safe_div(financial, total).map_or_else(
        || IndicatorValue::unavailable(NAME, "%", FORMULA, "total_liabilities is zero"),
        |ratio| IndicatorValue::available(NAME, round2(ratio * 100.0), "%", FORMULA),
    )
}

/// `(total_liabilities - financial_liabilities) / total_liabilities * 100`.
#[must_use]
pub fn operating_liability_ratio(balance: &FinancialStatement) -> IndicatorValue {
    const NAME: &str = "经营性负债率";
    const FORMULA: &str = "(total_liabilities - financial_liabilities) / total_liabilities * 100";
    let Some(total) = field(balance, "total_liabilities") else {
        return IndicatorValue::unavailable(NAME, "%", FORMULA, "total_liabilities missing");
    };
    let financial = financial_liabilities(balance).unwrap_or(0.0);
    safe_div(total - financial, total).map_or_else(
        || IndicatorValue::unavailable(NAME, "%", FORMULA, "total_liabilities is zero"),
        |ratio| IndicatorValue::available(NAME, round2(ratio * 100.0), "%", FORMULA),
    )
}

/// `annualize(net_operating_cash_flow) / core_profit`.
#[must_use]
pub fn core_profit_cash_ratio(
    income: &FinancialStatement,
    cash_flow: &FinancialStatement,
    report_period: &str,
) -> IndicatorValue {
    const NAME: &str = "核心利润现金比率";
    const FORMULA: &str = "annualize(net_operating_cash_flow) / core_profit";

    let revenue = field(income, "revenue");
    let cost = field(income, "cost");
    let rd = field(income, "rd_expense").unwrap_or(0.0);
    let (Some(revenue), Some(cost)) = (revenue, cost) else {
        return IndicatorValue::unavailable(NAME, "", FORMULA, "revenue or cost missing");
    };
    let core_profit = revenue - cost - rd;

    let Some(ocf) = field(cash_flow, "net_operating_cash_flow") else {
        return IndicatorValue::unavailable(NAME, "", FORMULA, "net_operating_cash_flow missing");
    };
    let Ok(factor) = annualization_factor(report_period) else {
        return IndicatorValue::unavailable(NAME, "", FORMULA, "invalid report period");
    };

    safe_div(ocf * factor, core_profit).map_or_else(
        || IndicatorValue::unavailable(NAME, "", FORMULA, "core profit is zero"),
        |ratio| IndicatorValue::available(NAME, round2(ratio), "", FORMULA).annualized(true),
    )
}

/// DuPont decomposition: `{net_profit_margin, asset_turnover,
/// equity_multiplier, roe}` where `roe ≈ net_profit_margin% *
/// asset_turnover * equity_multiplier`.
#[derive(Debug, Clone)]
pub struct DuPont {
    /// `net_profit / revenue * 100`.
    pub net_profit_margin: IndicatorValue,
    /// `annualize(revenue) / avg_total_assets`.
    pub asset_turnover: IndicatorValue,
    /// `avg_total_assets / avg_equity`.
    pub equity_multiplier: IndicatorValue,
    /// `net_profit_margin% * asset_turnover * equity_multiplier`.
    pub roe: IndicatorValue,
}

/// Computes the DuPont decomposition of ROE.
#[must_use]
pub fn dupont(
    income: &FinancialStatement,
    balance: &FinancialStatement,
    previous_balance: Option<&FinancialStatement>,
    report_period: &str,
) -> DuPont {
    let revenue = field(income, "revenue");
    let net_profit = field(income, "net_profit");
    let total_assets = field(balance, "total_assets");
    let equity = field(balance, "total_equity");
    let factor = annualization_factor(report_period).ok();

    let prior_assets = previous_balance.and_then(|b| field(b, "total_assets"));
    let prior_equity = previous_balance.and_then(|b| field(b, "total_equity"));

    let net_profit_margin = match (net_profit, revenue) {
        (Some(np), Some(rev)) => safe_div(np, rev).map_or_else(
            || IndicatorValue::unavailable("净利率", "%", "net_profit / revenue * 100", "revenue is zero"),
            |m| IndicatorValue::available("净利率", round2(m * 100.0), "%", "net_profit / revenue * 100"),
        ),
        _ => IndicatorValue::unavailable("净利率", "%", "net_profit / revenue * 100", "net_profit or revenue missing"),
    };

    let asset_turnover = match (revenue, total_assets, factor) {
        (Some(rev), Some(assets), Some(factor)) => {
            let avg_assets = average(assets, prior_assets);
            safe_div(rev * factor, avg_assets).map_or_else(
                || IndicatorValue::unavailable("总资产周转率", "次", "annualize(revenue) / avg_total_assets", "average assets is zero"),
                |t| IndicatorValue::available("总资产周转率", round2(t), "次", "annualize(revenue) / avg_total_assets").annualized(true),
            )
        }
        _ => IndicatorValue::unavailable("总资产周转率", "次", "annualize(revenue) / avg_total_assets", "revenue, assets, or period missing"),
    };

    let equity_multiplier = match (total_assets, equity) {
        (Some(assets), Some(equity)) => {
            let avg_assets = average(assets, prior_assets);
            let avg_equity = average(equity, prior_equity);
            safe_div(avg_assets, avg_equity).map_or_else(
                || IndicatorValue::unavailable("权益乘数", "次", "avg_total_assets / avg_equity", "average equity is zero"),
                |m| IndicatorValue::available("权益乘数", round2(m), "次", "avg_total_assets / avg_equity"),
            )
        }
        _ => IndicatorValue::unavailable("权益乘数", "次", "avg_total_assets / avg_equity", "total_assets or total_equity missing"),
    };

    let roe = match (
        net_profit_margin.value,
        asset_turnover.value,
        equity_multiplier.value,
    ) {
        (Some(margin), Some(turnover), Some(multiplier)) => IndicatorValue::available(
            "净资产收益率(杜邦)",
            round2(margin * turnover * multiplier),
            "%",
            "net_profit_margin% * asset_turnover * equity_multiplier",
        )
        .annualized(true),
        _ => IndicatorValue::unavailable(
            "净资产收益率(杜邦)",
            "%",
            "net_profit_margin% * asset_turnover * equity_multiplier",
            "a DuPont component is unavailable",
        ),
    };

    DuPont {
        net_profit_margin,
        asset_turnover,
        equity_multiplier,
        roe,
    }
}

/// Builds a growth-rate indicator (e.g. `revenue_growth`) between a
/// current and previous raw value, e.g. `营业收入增速`.
#[must_use]
pub fn growth_indicator(name: &str, unit: &str, current: Option<f64>, previous: Option<f64>) -> IndicatorValue {
    let rate = growth_rate(current, previous);
    let mut indicator = current.map_or_else(
        || IndicatorValue::unavailable(name, unit, "(current - previous) / |previous| * 100", "current value missing"),
        |value| IndicatorValue::available(name, value, unit, "(current - previous) / |previous| * 100"),
    );
    indicator = indicator.with_growth(rate, previous);
    if current.is_some() {
        indicator.available = true;
    }
    indicator
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn statement(pairs: &[(&str, &str)]) -> FinancialStatement {
        let mut statement = FinancialStatement::default();
        for (key, value) in pairs {
            statement
                .fields
                .insert((*key).to_string(), Decimal::from_str(value).unwrap());
        }
        statement
    }

    #[test]
    fn test_gross_margin_q1_sanity() {
        let income = statement(&[("revenue", "100"), ("cost", "60")]);
        let indicator = gross_margin(&income);
        assert_eq!(indicator.value, Some(40.0));
        assert!(indicator.available);
    }

    #[test]
    fn test_gross_margin_missing_cost_is_unavailable() {
        let income = statement(&[("revenue", "100")]);
        let indicator = gross_margin(&income);
        assert!(!indicator.available);
        assert_eq!(indicator.value, None);
    }

    #[test]
    fn test_return_on_equity_q1_annualized() {
        let income = statement(&[("net_profit", "10")]);
        let balance = statement(&[("total_equity", "200")]);
        let indicator = return_on_equity(&income, &balance, None, "2024-03-31");
        assert_eq!(indicator.value, Some(20.0));
        assert!(indicator.annualized);
    }

    #[test]
    fn test_growth_rate_null_previous_is_unavailable() {
        let indicator = growth_indicator("营业收入增速", "%", Some(200.0), None);
        assert_eq!(indicator.growth_rate, None);
        assert!(!indicator.available);
    }

    #[test]
    fn test_growth_rate_zero_base_is_null() {
        assert_eq!(growth_rate(Some(10.0), Some(0.0)), None);
    }

    #[test]
    fn test_ebit_falls_back_to_finance_expense_and_flags_approximate() {
        let income = statement(&[("total_profit", "50"), ("finance_expense", "5")]);
        let balance = statement(&[("total_assets", "400")]);
        let indicator = return_on_total_assets(&income, &balance, None, "2024-03-31");
        assert!(indicator.approximate);
    }

    #[test]
    fn test_financial_liability_ratio_requires_at_least_one_field() {
        let balance = statement(&[("total_liabilities", "100")]);
        let indicator = financial_liability_ratio(&balance);
        assert!(!indicator.available);
    }

    #[test]
    fn test_dupont_identity_holds_within_tolerance() {
        let income = statement(&[("revenue", "100"), ("net_profit", "10")]);
        let balance = statement(&[("total_assets", "400"), ("total_equity", "200")]);
        let result = dupont(&income, &balance, None, "2024-03-31");
        let (margin, turnover, multiplier, roe) = (
            result.net_profit_margin.value.unwrap(),
            result.asset_turnover.value.unwrap(),
            result.equity_multiplier.value.unwrap(),
            result.roe.value.unwrap(),
        );
        assert!((roe - margin * turnover * multiplier).abs() <= 0.01);
    }

    #[test]
    fn test_all_fields_null_yields_all_unavailable() {
        let income = FinancialStatement::default();
        let balance = FinancialStatement::default();
        assert!(!gross_margin(&income).available);
        assert!(!debt_to_asset_ratio(&balance).available);
    }
}
