//! Financial indicator calculation (C5).
//!
//! Pure, side-effect-free ratio and growth-rate computations over
//! [`crate::financial::FinancialStatement`] data. Every computation
//! null-propagates rather than panicking or substituting zero.

pub mod calculator;
mod types;

pub use calculator::{
    core_profit_cash_ratio, core_profit_margin, current_ratio, debt_to_asset_ratio,
    dupont, financial_liability_ratio, fixed_asset_turnover, gross_margin, growth_indicator,
    growth_rate, inventory_turnover, operating_asset_turnover, operating_liability_ratio,
    return_on_equity, return_on_total_assets, DuPont,
};
pub use types::{IndicatorPriority, IndicatorSet, IndicatorValue};
