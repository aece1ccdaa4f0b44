//! Percentage display helpers
//!
//! Rates travel as fractions; people read and type percentages.

use crate::errors::{AppError, Result};

/// 0.455 -> "45.5", 0.45 -> "45". Two decimals at most, trailing zeros trimmed.
pub fn format_percent(rate: f64) -> String {
    let percent = (rate * 100.0 * 100.0).round() / 100.0;
    let fixed = format!("{:.2}", percent);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');

    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// "45.5" or "45.5%" -> 0.455
pub fn parse_percent(input: &str) -> Result<f64> {
    let cleaned = input.trim().trim_end_matches('%').trim();

    let not_a_percentage = || AppError::validation("rate", format!("'{}' is not a percentage", input));

    let percent: f64 = cleaned.parse().map_err(|_| not_a_percentage())?;
    if !percent.is_finite() {
        return Err(not_a_percentage());
    }

    Ok(percent / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.455), "45.5");
        assert_eq!(format_percent(0.45), "45");
        assert_eq!(format_percent(0.4567), "45.67");
        assert_eq!(format_percent(1.0), "100");
        assert_eq!(format_percent(0.1), "10");
        assert_eq!(format_percent(0.0), "0");
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("45.5").unwrap(), 0.455);
        assert_eq!(parse_percent(" 45 % ").unwrap(), 0.45);

        for bad in ["abc", "inf", ""] {
            match parse_percent(bad) {
                Err(AppError::Validation { field, .. }) => assert_eq!(field.as_deref(), Some("rate")),
                other => panic!("expected a validation error for {:?}, got {:?}", bad, other),
            }
        }
    }
}
