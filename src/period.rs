//! Report-period normalization.
//!
//! Two encodings appear at the boundary: `YYYY-MM-DD` (financial data
//! service, indicator annualization) and `YYYYMMDD` (some ingestion paths).
//! Both are accepted on input; `YYYY-MM-DD` is the canonical internal form.

use crate::error::{ChunkingError, Result};

/// Normalizes a report period string to `YYYY-MM-DD`.
///
/// Accepts `YYYY-MM-DD` as-is (after validating its shape) and converts
/// `YYYYMMDD` to the hyphenated form.
///
/// # Errors
///
/// Returns [`ChunkingError::InvalidConfig`] if the string matches neither
/// accepted shape or decodes to an impossible calendar date.
pub fn normalize_period(period: &str) -> Result<String> {
    let digits_only: String = period.chars().filter(|c| *c != '-').collect();
    if digits_only.len() != 8 || !digits_only.chars().all(|c| c.is_ascii_digit()) {
        return Err(ChunkingError::InvalidConfig {
            reason: format!("report period '{period}' is not YYYY-MM-DD or YYYYMMDD"),
        }
        .into());
    }

    let year = &digits_only[0..4];
    let month = &digits_only[4..6];
    let day = &digits_only[6..8];

    let month_num: u32 = month.parse().unwrap_or(0);
    let day_num: u32 = day.parse().unwrap_or(0);
    if !(1..=12).contains(&month_num) || !(1..=31).contains(&day_num) {
        return Err(ChunkingError::InvalidConfig {
            reason: format!("report period '{period}' has an invalid month or day"),
        }
        .into());
    }

    Ok(format!("{year}-{month}-{day}"))
}

/// Returns the annualization factor for the quarter implied by `period`'s
/// month: Q1 -> 4.0, Q2 -> 2.0, Q3 -> 4/3, Q4 -> 1.0.
///
/// # Errors
///
/// Returns [`ChunkingError::InvalidConfig`] if `period` is not normalizable
/// or its month is not one of the four recognized quarter-end months
/// (3, 6, 9, 12).
pub fn annualization_factor(period: &str) -> Result<f64> {
    let normalized = normalize_period(period)?;
    let month: u32 = normalized[5..7].parse().unwrap_or(0);
    match month {
        3 => Ok(4.0),
        6 => Ok(2.0),
        9 => Ok(4.0 / 3.0),
        12 => Ok(1.0),
        _ => Err(ChunkingError::InvalidConfig {
            reason: format!("period '{period}' is not a recognized quarter end"),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hyphenated_unchanged() {
        assert_eq!(normalize_period("2024-03-31").unwrap(), "2024-03-31");
    }

    #[test]
    fn test_normalize_compact_form() {
        assert_eq!(normalize_period("20240331").unwrap(), "2024-03-31");
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(normalize_period("not-a-date").is_err());
    }

    #[test]
    fn test_normalize_rejects_bad_month() {
        assert!(normalize_period("20241331").is_err());
    }

    #[test]
    fn test_annualization_factors() {
        assert!((annualization_factor("2024-03-31").unwrap() - 4.0).abs() < 1e-9);
        assert!((annualization_factor("2024-06-30").unwrap() - 2.0).abs() < 1e-9);
        assert!((annualization_factor("2024-09-30").unwrap() - 4.0 / 3.0).abs() < 1e-9);
        assert!((annualization_factor("2024-12-31").unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_annualization_rejects_non_quarter_end() {
        assert!(annualization_factor("2024-02-15").is_err());
    }
}
