//! Indicator value type.

use serde::{Deserialize, Serialize};

/// One computed financial indicator.
///
/// Invariant: `available == false` implies `value == None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorValue {
    /// Display name (Chinese, matching the source's labels).
    pub name: String,
    /// The computed value, `None` when unavailable.
    pub value: Option<f64>,
    /// Unit string (`"%"`, `"元"`, `"次"`, ...).
    pub unit: String,
    /// Whether `value` could be computed.
    pub available: bool,
    /// Period-over-period growth rate in percent, when applicable.
    pub growth_rate: Option<f64>,
    /// The prior-period value, when applicable.
    pub previous: Option<f64>,
    /// Human-readable formula description.
    pub formula: String,
    /// Whether a flow component of this indicator was annualized.
    #[serde(default)]
    pub annualized: bool,
    /// Whether this value uses an approximate fallback (e.g. EBIT via
    /// `finance_expense` instead of `interest_expense`).
    #[serde(default)]
    pub approximate: bool,
    /// Why the indicator is unavailable, if it is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
}

impl IndicatorValue {
    /// Builds an unavailable indicator with the given reason.
    #[must_use]
    pub fn unavailable(name: &str, unit: &str, formula: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            unit: unit.to_string(),
            available: false,
            growth_rate: None,
            previous: None,
            formula: formula.to_string(),
            annualized: false,
            approximate: false,
            unavailable_reason: Some(reason.to_string()),
        }
    }

    /// Builds an available indicator.
    #[must_use]
    pub fn available(name: &str, value: f64, unit: &str, formula: &str) -> Self {
        Self {
            name: name.to_string(),
            value: Some(value),
            unit: unit.to_string(),
            available: true,
            growth_rate: None,
            previous: None,
            formula: formula.to_string(),
            annualized: false,
            approximate: false,
            unavailable_reason: None,
        }
    }

    /// Marks this indicator's flow component as annualized.
    #[must_use]
    pub const fn annualized(mut self, annualized: bool) -> Self {
        self.annualized = annualized;
        self
    }

    /// Marks this indicator as using an approximate fallback formula.
    #[must_use]
    pub const fn approximate(mut self, approximate: bool) -> Self {
        self.approximate = approximate;
        self
    }

    /// Attaches growth-rate and previous-value context.
    #[must_use]
    pub const fn with_growth(mut self, growth_rate: Option<f64>, previous: Option<f64>) -> Self {
        self.growth_rate = growth_rate;
        self.previous = previous;
        self
    }
}

/// Which priority bucket an indicator belongs to for one industry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorPriority {
    /// Shown to every industry.
    Core,
    /// Shown to most industries, lower prominence.
    Auxiliary,
    /// Industry-specific.
    Specific,
}

/// All indicators computed for one report, bucketed by priority.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// Core-priority indicators.
    pub core: Vec<IndicatorValue>,
    /// Auxiliary-priority indicators.
    pub auxiliary: Vec<IndicatorValue>,
    /// Industry-specific indicators.
    pub specific: Vec<IndicatorValue>,
}

impl IndicatorSet {
    /// Iterates every indicator in the set, regardless of bucket.
    pub fn all(&self) -> impl Iterator<Item = &IndicatorValue> {
        self.core
            .iter()
            .chain(self.auxiliary.iter())
            .chain(self.specific.iter())
    }
}
