//! Financial statement data model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which of the three statements a [`FinancialStatement`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Income statement.
    IncomeStatement,
    /// Balance sheet.
    BalanceSheet,
    /// Cash flow statement.
    CashFlow,
}

/// A mapping from semantic field name to a nullable decimal value.
///
/// Unknown wire keys are ignored at parse time; fields absent from the
/// upstream response are `None` (not zero) — callers must not conflate the
/// two.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialStatement {
    /// Raw semantic-field → value map, already aliased from wire keys.
    #[serde(flatten)]
    pub fields: HashMap<String, Decimal>,
}

impl FinancialStatement {
    /// Looks up a semantic field, returning `None` if absent.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Decimal> {
        self.fields.get(field).copied()
    }

    /// Builds a statement from raw wire JSON, applying the field alias
    /// table and dropping unrecognized keys.
    #[must_use]
    pub fn from_wire(raw: &HashMap<String, serde_json::Value>) -> Self {
        let mut fields = HashMap::new();
        for (wire_key, value) in raw {
            let Some(semantic) = alias_field(wire_key) else {
                continue;
            };
            if let Some(decimal) = value.as_str().and_then(|s| s.parse::<Decimal>().ok()).or_else(
                || {
                    value
                        .as_f64()
                        .and_then(|f| Decimal::try_from(f).ok())
                },
            ) {
                fields.insert(semantic.to_string(), decimal);
            }
        }
        Self { fields }
    }
}

/// Maps a wire field name to its semantic field name, or `None` if the key
/// is not part of the recognized aliasing table.
fn alias_field(wire_key: &str) -> Option<&'static str> {
    const ALIASES: &[(&str, &str)] = &[
        ("revenue", "revenue"),
        ("total_revenue", "revenue"),
        ("operating_revenue", "revenue"),
        ("cost", "cost"),
        ("operating_cost", "cost"),
        ("rd_expense", "rd_expense"),
        ("research_expense", "rd_expense"),
        ("total_assets", "total_assets"),
        ("total_liabilities", "total_liabilities"),
        ("total_equity", "total_equity"),
        ("shareholders_equity", "total_equity"),
        ("net_profit", "net_profit"),
        ("net_income", "net_profit"),
        ("total_profit", "total_profit"),
        ("interest_expense", "interest_expense"),
        ("finance_expense", "finance_expense"),
        ("inventory", "inventory"),
        ("fixed_assets", "fixed_assets"),
        ("investment_assets", "investment_assets"),
        ("contract_liability", "contract_liability"),
        ("current_assets", "current_assets"),
        ("current_liabilities", "current_liabilities"),
        ("net_operating_cash_flow", "net_operating_cash_flow"),
        ("operating_cash_flow", "net_operating_cash_flow"),
        ("short_term_borrowing", "short_term_borrowing"),
        ("long_term_borrowing", "long_term_borrowing"),
        ("bonds_payable", "bonds_payable"),
        ("lease_liability", "lease_liability"),
        ("trading_financial_liability", "trading_financial_liability"),
        (
            "non_current_liability_due_within_one_year",
            "non_current_liability_due_within_one_year",
        ),
    ];
    ALIASES
        .iter()
        .find(|(wire, _)| *wire == wire_key)
        .map(|(_, semantic)| *semantic)
}

/// The composite bundle returned by `complete_financial_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteFinancialBundle {
    /// The company's stock code.
    pub stock_code: String,
    /// Normalized `YYYY-MM-DD` report period.
    pub report_period: String,
    /// Report type, `"A"` (annual) or `"B"` (other).
    pub report_type: String,
    /// Current-period income statement.
    pub income_statement: FinancialStatement,
    /// Current-period balance sheet.
    pub balance_sheet: FinancialStatement,
    /// Current-period cash flow statement.
    pub cash_flow: FinancialStatement,
    /// The prior period used for growth/averages, if any.
    pub previous_period: Option<String>,
    /// The prior period's three statements, if `previous_period` is set.
    pub previous_data: Option<PreviousStatements>,
}

/// The prior period's three statements, present only when a comparison
/// period was found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviousStatements {
    /// Prior-period income statement.
    pub income_statement: FinancialStatement,
    /// Prior-period balance sheet.
    pub balance_sheet: FinancialStatement,
    /// Prior-period cash flow statement.
    pub cash_flow: FinancialStatement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_field_is_ignored() {
        let mut raw = HashMap::new();
        raw.insert("some_unmapped_field".to_string(), serde_json::json!("1.0"));
        let statement = FinancialStatement::from_wire(&raw);
        assert!(statement.fields.is_empty());
    }

    #[test]
    fn test_known_alias_maps_to_semantic_field() {
        let mut raw = HashMap::new();
        raw.insert("total_revenue".to_string(), serde_json::json!("100.50"));
        let statement = FinancialStatement::from_wire(&raw);
        assert_eq!(statement.get("revenue"), Some(Decimal::new(10050, 2)));
    }

    #[test]
    fn test_absent_field_is_none_not_zero() {
        let statement = FinancialStatement::default();
        assert_eq!(statement.get("revenue"), None);
    }
}
