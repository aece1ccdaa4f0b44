//! Rate range types shared by the resolver, the stores and the HTTP layer

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Vehicle category a rate table applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Auto,
    Moto,
}

impl Category {
    /// Loan terms (months) a range of this category must price
    pub fn supported_terms(self) -> &'static [u32] {
        match self {
            Category::Auto => &[6, 12, 24, 48],
            Category::Moto => &[6, 12, 24],
        }
    }

    pub fn supports_term(self, term_months: u32) -> bool {
        self.supported_terms().contains(&term_months)
    }

    /// Fail with `InvalidTerm` unless the term is offered for this category
    pub fn require_term(self, term_months: u32) -> Result<()> {
        if self.supports_term(term_months) {
            Ok(())
        } else {
            Err(AppError::InvalidTerm {
                category: self.to_string(),
                term: term_months,
            })
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Auto => "auto",
            Category::Moto => "moto",
        }
    }

    /// Advisory lock id serializing writers of this category's rate table
    pub fn lock_key(self) -> i64 {
        match self {
            Category::Auto => 0x6c72_0001,
            Category::Moto => 0x6c72_0002,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Category::Auto),
            "moto" => Ok(Category::Moto),
            other => Err(AppError::InvalidFormat {
                message: format!("unknown vehicle category '{}'", other),
            }),
        }
    }
}

/// Inclusive model-year span; also the composite key of a range group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeKey {
    pub year_from: i32,
    pub year_to: i32,
}

impl RangeKey {
    pub fn new(year_from: i32, year_to: i32) -> Self {
        Self { year_from, year_to }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.year_from <= year && year <= self.year_to
    }
}

impl fmt::Display for RangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year_from, self.year_to)
    }
}

impl FromStr for RangeKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AppError::InvalidFormat {
            message: format!("range key '{}' must look like 2015-2020", s),
        };

        let (from, to) = s.split_once('-').ok_or_else(invalid)?;
        let year_from = from.trim().parse::<i32>().map_err(|_| invalid())?;
        let year_to = to.trim().parse::<i32>().map_err(|_| invalid())?;

        Ok(RangeKey { year_from, year_to })
    }
}

/// One configured interest rate of the term-bucketed model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRange {
    pub id: Uuid,
    pub category: Category,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub year_from: i32,
    pub year_to: i32,
    pub term_months: u32,
    /// Annual rate as a fraction, 0.45 = 45%
    pub interest_rate: f64,
    pub is_active: bool,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RateRange {
    pub fn key(&self) -> RangeKey {
        RangeKey::new(self.year_from, self.year_to)
    }

    pub fn contains_year(&self, year: i32) -> bool {
        self.key().contains(year)
    }
}

/// One row of the single-rate model: no term bucketing, overlaps settled by priority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRate {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub year_from: i32,
    pub year_to: i32,
    pub interest_rate: f64,
    pub is_active: bool,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LegacyRate {
    pub fn key(&self) -> RangeKey {
        RangeKey::new(self.year_from, self.year_to)
    }

    pub fn contains_year(&self, year: i32) -> bool {
        self.key().contains(year)
    }
}

/// Rows sharing a year span, presented as one range with a rate per term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeGroup {
    pub key: String,
    pub category: Category,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub year_from: i32,
    pub year_to: i32,
    pub is_active: bool,
    pub terms: BTreeMap<u32, f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated multi-term write for one category
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDraft {
    pub category: Category,
    pub name: String,
    pub description: Option<String>,
    pub year_from: i32,
    pub year_to: i32,
    pub is_active: bool,
    /// Term in months -> annual rate
    pub terms: BTreeMap<u32, f64>,
}

/// Row changes needed to move an existing group onto a draft
#[derive(Debug, Clone, Default)]
pub struct GroupRewrite {
    /// Existing rows rewritten in place (id and createdAt kept)
    pub updated: Vec<RateRange>,
    /// Terms the group did not have yet
    pub inserted: Vec<RateRange>,
    /// Rows whose term is no longer part of the group
    pub removed: Vec<Uuid>,
}

impl GroupRewrite {
    /// All rows of the group after the rewrite, ordered by term
    pub fn rows(&self) -> Vec<RateRange> {
        let mut rows: Vec<RateRange> = self
            .updated
            .iter()
            .chain(self.inserted.iter())
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.term_months);
        rows
    }
}

impl GroupDraft {
    pub fn key(&self) -> RangeKey {
        RangeKey::new(self.year_from, self.year_to)
    }

    fn row(&self, id: Uuid, term_months: u32, interest_rate: f64, now: DateTime<Utc>) -> RateRange {
        RateRange {
            id,
            category: self.category,
            name: self.name.clone(),
            description: self.description.clone(),
            year_from: self.year_from,
            year_to: self.year_to,
            term_months,
            interest_rate,
            is_active: self.is_active,
            priority: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fresh rows for a new group, one per term
    pub fn new_rows(&self, now: DateTime<Utc>) -> Vec<RateRange> {
        self.terms
            .iter()
            .map(|(&term, &rate)| self.row(Uuid::new_v4(), term, rate, now))
            .collect()
    }

    /// Plan the rewrite of `current` (all rows under the old key) onto this draft
    pub fn rewrite(&self, current: &[RateRange], now: DateTime<Utc>) -> GroupRewrite {
        let mut plan = GroupRewrite::default();

        for (&term, &rate) in &self.terms {
            match current.iter().find(|r| r.term_months == term) {
                Some(existing) => {
                    let mut row = self.row(existing.id, term, rate, now);
                    row.created_at = existing.created_at;
                    row.priority = existing.priority;
                    plan.updated.push(row);
                }
                None => plan.inserted.push(self.row(Uuid::new_v4(), term, rate, now)),
            }
        }

        plan.removed = current
            .iter()
            .filter(|r| !self.terms.contains_key(&r.term_months))
            .map(|r| r.id)
            .collect();

        plan
    }
}

/// Validated write for the single-rate model
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyDraft {
    pub name: String,
    pub description: Option<String>,
    pub year_from: i32,
    pub year_to: i32,
    pub interest_rate: f64,
    pub is_active: bool,
    pub priority: i32,
}

impl LegacyDraft {
    pub fn new_row(&self, now: DateTime<Utc>) -> LegacyRate {
        LegacyRate {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            description: self.description.clone(),
            year_from: self.year_from,
            year_to: self.year_to,
            interest_rate: self.interest_rate,
            is_active: self.is_active,
            priority: self.priority,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply this draft to an existing row, keeping its identity
    pub fn apply(&self, existing: &LegacyRate, now: DateTime<Utc>) -> LegacyRate {
        LegacyRate {
            id: existing.id,
            created_at: existing.created_at,
            ..self.new_row(now)
        }
    }
}
