//! Boundary validation turning request records into drafts

use super::api::{LegacyRateInput, TermRangeInput};
use super::model::{Category, GroupDraft, LegacyDraft};
use crate::errors::{AppError, Result};
use crate::{MAX_MODEL_YEAR, MIN_MODEL_YEAR};
use validator::Validate;

/// Rates are annual fractions in (0, 1]
pub fn check_rate(field: &str, rate: f64) -> Result<()> {
    if rate.is_finite() && rate > 0.0 && rate <= 1.0 {
        Ok(())
    } else {
        Err(AppError::validation(
            field,
            format!("{} must be a fraction in (0, 1], got {}", field, rate),
        ))
    }
}

/// Year bounds within [1900, 2050] and ordered
pub fn check_span(year_from: i32, year_to: i32) -> Result<()> {
    for (field, year) in [("yearFrom", year_from), ("yearTo", year_to)] {
        if !(MIN_MODEL_YEAR..=MAX_MODEL_YEAR).contains(&year) {
            return Err(AppError::validation(
                field,
                format!("{} must be between {} and {}", field, MIN_MODEL_YEAR, MAX_MODEL_YEAR),
            ));
        }
    }

    if year_from > year_to {
        return Err(AppError::validation(
            "yearFrom",
            format!("yearFrom ({}) must not exceed yearTo ({})", year_from, year_to),
        ));
    }

    Ok(())
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "name must not be blank"));
    }
    Ok(name.to_string())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Validate a multi-term write. The terms must be exactly the category's set.
pub fn validate_group(category: Category, input: TermRangeInput) -> Result<GroupDraft> {
    input.validate()?;
    check_span(input.year_from, input.year_to)?;

    if let Some(&term) = input.terms.keys().find(|&&t| !category.supports_term(t)) {
        return Err(AppError::InvalidTerm {
            category: category.to_string(),
            term,
        });
    }

    let missing: Vec<String> = category
        .supported_terms()
        .iter()
        .filter(|t| !input.terms.contains_key(t))
        .map(|t| t.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::validation(
            "terms",
            format!("{} ranges need a rate for every term; missing: {}", category, missing.join(", ")),
        ));
    }

    for (term, &rate) in &input.terms {
        check_rate(&format!("terms.{}", term), rate)?;
    }

    Ok(GroupDraft {
        category,
        name: clean_name(&input.name)?,
        description: clean_description(input.description),
        year_from: input.year_from,
        year_to: input.year_to,
        is_active: input.is_active,
        terms: input.terms,
    })
}

/// Validate a single-rate write
pub fn validate_legacy(input: LegacyRateInput) -> Result<LegacyDraft> {
    input.validate()?;
    check_span(input.year_from, input.year_to)?;
    check_rate("interestRate", input.interest_rate)?;

    Ok(LegacyDraft {
        name: clean_name(&input.name)?,
        description: clean_description(input.description),
        year_from: input.year_from,
        year_to: input.year_to,
        interest_rate: input.interest_rate,
        is_active: input.is_active,
        priority: input.priority,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn input(terms: &[(u32, f64)]) -> TermRangeInput {
        TermRangeInput {
            name: " Late models ".into(),
            description: Some("   ".into()),
            year_from: 2015,
            year_to: 2020,
            is_active: true,
            terms: terms.iter().copied().collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_valid_auto_group() {
        let draft = validate_group(
            Category::Auto,
            input(&[(6, 0.4), (12, 0.45), (24, 0.5), (48, 0.55)]),
        )
        .unwrap();
        assert_eq!(draft.name, "Late models");
        assert_eq!(draft.description, None);
        assert_eq!(draft.terms.len(), 4);
    }

    #[test]
    fn test_partial_terms_rejected() {
        let err = validate_group(Category::Auto, input(&[(6, 0.4), (12, 0.45), (24, 0.5)]))
            .unwrap_err();
        match err {
            AppError::Validation { message, field } => {
                assert_eq!(field.as_deref(), Some("terms"));
                assert!(message.contains("48"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_term_outside_category_rejected() {
        let err = validate_group(
            Category::Moto,
            input(&[(6, 0.4), (12, 0.45), (24, 0.5), (48, 0.55)]),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidTerm { term: 48, .. }));
    }

    #[test]
    fn test_rate_bounds() {
        assert!(check_rate("r", 1.0).is_ok());
        assert!(check_rate("r", 0.0001).is_ok());
        assert!(check_rate("r", 0.0).is_err());
        assert!(check_rate("r", 1.01).is_err());
        assert!(check_rate("r", f64::NAN).is_err());

        let err = validate_group(Category::Moto, input(&[(6, 0.4), (12, 45.0), (24, 0.5)]))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_span_rules() {
        assert!(check_span(2020, 2020).is_ok());
        assert!(check_span(2021, 2020).is_err());
        assert!(check_span(1899, 2020).is_err());
        assert!(check_span(2000, 2051).is_err());
    }

    #[test]
    fn test_legacy_validation() {
        let legacy = LegacyRateInput {
            name: "base".into(),
            description: Some("fallback".into()),
            year_from: 1990,
            year_to: 2024,
            interest_rate: 0.6,
            is_active: true,
            priority: 3,
        };
        let draft = validate_legacy(legacy.clone()).unwrap();
        assert_eq!(draft.priority, 3);
        assert_eq!(draft.description.as_deref(), Some("fallback"));

        let bad = LegacyRateInput { interest_rate: 1.5, ..legacy };
        assert!(validate_legacy(bad).is_err());
    }
}
