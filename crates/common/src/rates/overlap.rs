//! Write-time overlap detection for the term-bucketed model
//!
//! Within a category and term, active ranges must have disjoint year
//! spans. Stores call [`check_group_write`] inside their write critical
//! section, with every row of the category loaded.

use super::model::{GroupDraft, RangeKey, RateRange};
use crate::errors::{AppError, Result};
use std::collections::BTreeSet;

/// Inclusive interval intersection
pub fn intervals_overlap(a: RangeKey, b: RangeKey) -> bool {
    a.year_from <= b.year_to && b.year_from <= a.year_to
}

/// Terms on which the draft would collide with another active range.
///
/// Rows under `exclude` (the group being rewritten) are ignored. An
/// inactive draft never collides.
pub fn conflicting_terms(
    existing: &[RateRange],
    draft: &GroupDraft,
    exclude: Option<RangeKey>,
) -> Vec<u32> {
    if !draft.is_active {
        return Vec::new();
    }

    let span = draft.key();

    existing
        .iter()
        .filter(|r| r.is_active && r.category == draft.category)
        .filter(|r| exclude != Some(r.key()))
        .filter(|r| draft.terms.contains_key(&r.term_months))
        .filter(|r| intervals_overlap(r.key(), span))
        .map(|r| r.term_months)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Reject a group write that breaks disjointness or reuses another group's key
pub fn check_group_write(
    existing: &[RateRange],
    draft: &GroupDraft,
    exclude: Option<RangeKey>,
) -> Result<()> {
    let terms = conflicting_terms(existing, draft, exclude);
    if !terms.is_empty() {
        return Err(AppError::Overlap { terms });
    }

    let key = draft.key();
    let taken = exclude != Some(key)
        && existing
            .iter()
            .any(|r| r.category == draft.category && r.key() == key);
    if taken {
        return Err(AppError::Duplicate {
            message: format!("a {} range {} already exists", draft.category, key),
        });
    }

    Ok(())
}
