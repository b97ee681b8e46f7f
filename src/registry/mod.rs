//! Industry registry (C9).
//!
//! A process-wide, read-only-after-init mapping from industry code to its
//! indicator priority assignments. Drives both C5's core/auxiliary/specific
//! bucketing and C8's analysis formatting.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{Result, WorkflowError};
use crate::indicators::IndicatorPriority;

/// One of the fixed ratio/growth computations C5 can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKey {
    /// `(revenue - cost) / revenue`.
    GrossMargin,
    /// `(revenue - cost - rd_expense) / revenue`.
    CoreProfitMargin,
    /// Annualized EBIT over average total assets.
    ReturnOnTotalAssets,
    /// Annualized net profit over average equity.
    ReturnOnEquity,
    /// Annualized cost over average inventory.
    InventoryTurnover,
    /// Annualized revenue over average fixed assets.
    FixedAssetTurnover,
    /// Annualized revenue over average operating assets.
    OperatingAssetTurnover,
    /// Current assets over current liabilities.
    CurrentRatio,
    /// Total liabilities over total assets.
    DebtToAssetRatio,
    /// Interest-bearing liabilities over total liabilities.
    FinancialLiabilityRatio,
    /// Total liabilities minus financial liabilities, as a ratio.
    OperatingLiabilityRatio,
    /// Annualized operating cash flow over core profit.
    CoreProfitCashRatio,
    /// DuPont-decomposed return on equity.
    DuPontRoe,
    /// Revenue growth against the prior period.
    RevenueGrowth,
    /// Net profit growth against the prior period.
    NetProfitGrowth,
}

impl IndicatorKey {
    /// Display name matching [`crate::indicators::IndicatorValue::name`] for
    /// the corresponding computation.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::GrossMargin => "毛利率",
            Self::CoreProfitMargin => "核心利润率",
            Self::ReturnOnTotalAssets => "总资产报酬率(ROA)",
            Self::ReturnOnEquity => "净资产收益率(ROE)",
            Self::InventoryTurnover => "存货周转率",
            Self::FixedAssetTurnover => "固定资产周转率",
            Self::OperatingAssetTurnover => "经营性资产周转率",
            Self::CurrentRatio => "流动比率",
            Self::DebtToAssetRatio => "资产负债率",
            Self::FinancialLiabilityRatio => "有息负债率",
            Self::OperatingLiabilityRatio => "经营性负债率",
            Self::CoreProfitCashRatio => "核心利润现金比率",
            Self::DuPontRoe => "净资产收益率(杜邦)",
            Self::RevenueGrowth => "营业收入增速",
            Self::NetProfitGrowth => "净利润增速",
        }
    }
}

/// A single indicator's priority assignment within one industry.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorAssignment {
    /// Which computation this assignment refers to.
    pub key: IndicatorKey,
    /// Priority bucket for this industry.
    pub priority: IndicatorPriority,
}

const fn assign(key: IndicatorKey, priority: IndicatorPriority) -> IndicatorAssignment {
    IndicatorAssignment { key, priority }
}

/// An industry's display identity and indicator priority assignments.
#[derive(Debug, Clone)]
pub struct IndustryProfile {
    /// Short industry code, e.g. `"general"`.
    pub code: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Indicator priority assignments for this industry.
    pub indicators: &'static [IndicatorAssignment],
}

impl IndustryProfile {
    /// Returns this industry's indicators at the given priority, in
    /// declaration order.
    #[must_use]
    pub fn by_priority(&self, priority: IndicatorPriority) -> Vec<IndicatorKey> {
        self.indicators
            .iter()
            .filter(|assignment| assignment.priority == priority)
            .map(|assignment| assignment.key)
            .collect()
    }
}

use IndicatorKey::{
    CoreProfitCashRatio, CoreProfitMargin, CurrentRatio, DebtToAssetRatio, DuPontRoe,
    FinancialLiabilityRatio, FixedAssetTurnover, GrossMargin, InventoryTurnover,
    NetProfitGrowth, OperatingAssetTurnover, OperatingLiabilityRatio, ReturnOnEquity,
    ReturnOnTotalAssets, RevenueGrowth,
};
use IndicatorPriority::{Auxiliary, Core, Specific};

static GENERAL_INDICATORS: &[IndicatorAssignment] = &[
    assign(GrossMargin, Core),
    assign(ReturnOnEquity, Core),
    assign(ReturnOnTotalAssets, Core),
    assign(RevenueGrowth, Core),
    assign(NetProfitGrowth, Core),
    assign(CoreProfitMargin, Auxiliary),
    assign(DebtToAssetRatio, Auxiliary),
    assign(CurrentRatio, Auxiliary),
    assign(DuPontRoe, Auxiliary),
    assign(CoreProfitCashRatio, Specific),
    assign(FinancialLiabilityRatio, Specific),
    assign(OperatingLiabilityRatio, Specific),
];

static MANUFACTURING_INDICATORS: &[IndicatorAssignment] = &[
    assign(GrossMargin, Core),
    assign(ReturnOnEquity, Core),
    assign(InventoryTurnover, Core),
    assign(RevenueGrowth, Core),
    assign(NetProfitGrowth, Core),
    assign(FixedAssetTurnover, Auxiliary),
    assign(OperatingAssetTurnover, Auxiliary),
    assign(ReturnOnTotalAssets, Auxiliary),
    assign(CoreProfitMargin, Auxiliary),
    assign(DebtToAssetRatio, Specific),
    assign(FinancialLiabilityRatio, Specific),
    assign(CoreProfitCashRatio, Specific),
];

static RETAIL_INDICATORS: &[IndicatorAssignment] = &[
    assign(GrossMargin, Core),
    assign(RevenueGrowth, Core),
    assign(NetProfitGrowth, Core),
    assign(CoreProfitMargin, Core),
    assign(InventoryTurnover, Auxiliary),
    assign(CurrentRatio, Auxiliary),
    assign(ReturnOnEquity, Auxiliary),
    assign(OperatingAssetTurnover, Specific),
    assign(DebtToAssetRatio, Specific),
    assign(CoreProfitCashRatio, Specific),
];

static PROFILES: &[IndustryProfile] = &[
    IndustryProfile {
        code: "general",
        name: "综合",
        indicators: GENERAL_INDICATORS,
    },
    IndustryProfile {
        code: "manufacturing",
        name: "制造业",
        indicators: MANUFACTURING_INDICATORS,
    },
    IndustryProfile {
        code: "retail",
        name: "零售业",
        indicators: RETAIL_INDICATORS,
    },
];

fn index() -> &'static HashMap<&'static str, &'static IndustryProfile> {
    static INDEX: OnceLock<HashMap<&'static str, &'static IndustryProfile>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut map = HashMap::new();
        for profile in PROFILES {
            map.insert(profile.code, profile);
            map.insert(profile.name, profile);
        }
        map
    })
}

/// Looks up an industry profile by its code or display name.
///
/// # Errors
///
/// Returns [`WorkflowError::UnknownIndustry`] if `code_or_name` matches
/// neither a registered code nor a display name.
pub fn lookup(code_or_name: &str) -> Result<&'static IndustryProfile> {
    index()
        .get(code_or_name)
        .copied()
        .ok_or_else(|| {
            WorkflowError::UnknownIndustry {
                code: code_or_name.to_string(),
            }
            .into()
        })
}

/// Lists every registered industry code.
#[must_use]
pub fn codes() -> Vec<&'static str> {
    PROFILES.iter().map(|profile| profile.code).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_code() {
        let profile = lookup("manufacturing").unwrap();
        assert_eq!(profile.name, "制造业");
    }

    #[test]
    fn test_lookup_by_display_name() {
        let profile = lookup("综合").unwrap();
        assert_eq!(profile.code, "general");
    }

    #[test]
    fn test_lookup_unknown_is_error() {
        let err = lookup("not-an-industry").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_general_by_priority_nonempty() {
        let profile = lookup("general").unwrap();
        assert!(!profile.by_priority(IndicatorPriority::Core).is_empty());
    }
}
