//! Read-side selection and grouping

use super::model::{Category, LegacyRate, RangeGroup, RateRange};
use std::collections::BTreeMap;

/// Active term row applying to `year`.
///
/// Write-time checks leave at most one candidate; if several slip through,
/// the highest priority wins, then the most recently updated.
pub fn pick_term_rate(
    rows: &[RateRange],
    category: Category,
    term_months: u32,
    year: i32,
) -> Option<&RateRange> {
    rows.iter()
        .filter(|r| r.is_active && r.category == category && r.term_months == term_months)
        .filter(|r| r.contains_year(year))
        .max_by_key(|r| (r.priority, r.updated_at))
}

/// Active single-rate row applying to `year`; overlaps are normal here
pub fn pick_legacy_rate(rows: &[LegacyRate], year: i32) -> Option<&LegacyRate> {
    rows.iter()
        .filter(|r| r.is_active && r.contains_year(year))
        .max_by_key(|r| (r.priority, r.updated_at))
}

/// Number of active rows matching; more than one means the invariant was broken
pub fn count_term_matches(rows: &[RateRange], category: Category, term_months: u32, year: i32) -> usize {
    rows.iter()
        .filter(|r| r.is_active && r.category == category && r.term_months == term_months)
        .filter(|r| r.contains_year(year))
        .count()
}

/// Group term rows by `(category, yearFrom, yearTo)`, ordered by span
pub fn group_ranges(rows: &[RateRange]) -> Vec<RangeGroup> {
    let mut buckets: BTreeMap<(Category, i32, i32), Vec<&RateRange>> = BTreeMap::new();
    for row in rows {
        buckets
            .entry((row.category, row.year_from, row.year_to))
            .or_default()
            .push(row);
    }

    buckets
        .into_values()
        .filter_map(|members| {
            let first = *members.first()?;
            Some(RangeGroup {
                key: first.key().to_string(),
                category: first.category,
                name: first.name.clone(),
                description: first.description.clone(),
                year_from: first.year_from,
                year_to: first.year_to,
                is_active: members.iter().any(|r| r.is_active),
                terms: members.iter().map(|r| (r.term_months, r.interest_rate)).collect(),
                created_at: members.iter().map(|r| r.created_at).min()?,
                updated_at: members.iter().map(|r| r.updated_at).max()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::model::GroupDraft;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn rows(category: Category, from: i32, to: i32, rate: f64) -> Vec<RateRange> {
        GroupDraft {
            category,
            name: format!("{}-{}", from, to),
            description: None,
            year_from: from,
            year_to: to,
            is_active: true,
            terms: category.supported_terms().iter().map(|&t| (t, rate)).collect(),
        }
        .new_rows(Utc::now())
    }

    fn legacy(from: i32, to: i32, rate: f64, priority: i32) -> LegacyRate {
        let now = Utc::now();
        LegacyRate {
            id: Uuid::new_v4(),
            name: format!("{}-{}", from, to),
            description: None,
            year_from: from,
            year_to: to,
            interest_rate: rate,
            is_active: true,
            priority,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_pick_term_rate() {
        let mut all = rows(Category::Auto, 2015, 2020, 0.45);
        all.extend(rows(Category::Auto, 2021, 2025, 0.5));

        let hit = pick_term_rate(&all, Category::Auto, 12, 2018).unwrap();
        assert_eq!(hit.interest_rate, 0.45);
        let hit = pick_term_rate(&all, Category::Auto, 48, 2021).unwrap();
        assert_eq!(hit.interest_rate, 0.5);

        assert!(pick_term_rate(&all, Category::Auto, 12, 2014).is_none());
        assert!(pick_term_rate(&all, Category::Auto, 12, 3000).is_none());
        assert!(pick_term_rate(&all, Category::Moto, 12, 2018).is_none());
    }

    #[test]
    fn test_inactive_rows_skipped() {
        let mut all = rows(Category::Moto, 2015, 2020, 0.45);
        for row in &mut all {
            row.is_active = false;
        }
        assert!(pick_term_rate(&all, Category::Moto, 6, 2016).is_none());
    }

    #[test]
    fn test_tie_break_priority_then_recency() {
        let mut all = rows(Category::Moto, 2015, 2020, 0.40);
        let mut newer = rows(Category::Moto, 2018, 2022, 0.50);
        for row in &mut newer {
            row.updated_at = row.updated_at + Duration::minutes(5);
        }
        all.extend(newer);
        assert_eq!(count_term_matches(&all, Category::Moto, 12, 2019), 2);
        assert_eq!(pick_term_rate(&all, Category::Moto, 12, 2019).unwrap().interest_rate, 0.50);

        for row in all.iter_mut().filter(|r| r.interest_rate == 0.40) {
            row.priority = 10;
        }
        assert_eq!(pick_term_rate(&all, Category::Moto, 12, 2019).unwrap().interest_rate, 0.40);
    }

    #[test]
    fn test_pick_legacy_by_priority() {
        let all = vec![legacy(2000, 2030, 0.6, 0), legacy(2015, 2020, 0.4, 5)];
        assert_eq!(pick_legacy_rate(&all, 2016).unwrap().interest_rate, 0.4);
        assert_eq!(pick_legacy_rate(&all, 2025).unwrap().interest_rate, 0.6);
        assert!(pick_legacy_rate(&all, 1999).is_none());
    }

    #[test]
    fn test_group_ranges() {
        let mut all = rows(Category::Auto, 2021, 2025, 0.5);
        all.extend(rows(Category::Auto, 2015, 2020, 0.45));

        let groups = group_ranges(&all);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "2015-2020");
        assert_eq!(groups[0].terms.len(), 4);
        assert_eq!(groups[0].terms[&24], 0.45);
        assert_eq!(groups[1].key, "2021-2025");
        assert!(groups.iter().all(|g| g.is_active));
    }
}
