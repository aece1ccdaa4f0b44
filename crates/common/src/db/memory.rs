//! In-process rate store
//!
//! Backs local runs and tests. One write lock covers the overlap check and
//! the row changes, which gives the same all-or-nothing behavior as the
//! Postgres transaction.

use super::store::RateStore;
use crate::errors::{AppError, Result};
use crate::rates::{
    check_group_write, Category, GroupDraft, LegacyDraft, LegacyRate, RangeKey, RateRange,
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
    term_rows: Vec<RateRange>,
    legacy: Vec<LegacyRate>,
}

/// Rate tables held in memory
#[derive(Debug, Default)]
pub struct MemoryRateStore {
    state: RwLock<MemoryState>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn span_order(rows: &mut [RateRange]) {
    rows.sort_by_key(|r| (r.year_from, r.year_to, r.term_months));
}

fn range_not_found(category: Category, key: RangeKey) -> AppError {
    AppError::RangeNotFound {
        category: category.to_string(),
        key: key.to_string(),
    }
}

fn legacy_not_found(id: Uuid) -> AppError {
    AppError::NotFound {
        resource_type: "RateRange".to_string(),
        id: id.to_string(),
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn list_term_ranges(&self, category: Category) -> Result<Vec<RateRange>> {
        let state = self.state.read().await;
        let mut rows: Vec<RateRange> = state
            .term_rows
            .iter()
            .filter(|r| r.category == category)
            .cloned()
            .collect();
        span_order(&mut rows);
        Ok(rows)
    }

    async fn active_term_ranges(&self, category: Category, term_months: u32) -> Result<Vec<RateRange>> {
        let state = self.state.read().await;
        Ok(state
            .term_rows
            .iter()
            .filter(|r| r.is_active && r.category == category && r.term_months == term_months)
            .cloned()
            .collect())
    }

    async fn find_term_group(&self, category: Category, key: RangeKey) -> Result<Vec<RateRange>> {
        let state = self.state.read().await;
        let mut rows: Vec<RateRange> = state
            .term_rows
            .iter()
            .filter(|r| r.category == category && r.key() == key)
            .cloned()
            .collect();

        if rows.is_empty() {
            return Err(range_not_found(category, key));
        }
        span_order(&mut rows);
        Ok(rows)
    }

    async fn create_term_group(&self, draft: GroupDraft) -> Result<Vec<RateRange>> {
        let mut state = self.state.write().await;
        check_group_write(&state.term_rows, &draft, None)?;

        let rows = draft.new_rows(Utc::now());
        state.term_rows.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn update_term_group(&self, key: RangeKey, draft: GroupDraft) -> Result<Vec<RateRange>> {
        let mut state = self.state.write().await;
        let category = draft.category;

        let current: Vec<RateRange> = state
            .term_rows
            .iter()
            .filter(|r| r.category == category && r.key() == key)
            .cloned()
            .collect();
        if current.is_empty() {
            return Err(range_not_found(category, key));
        }

        check_group_write(&state.term_rows, &draft, Some(key))?;

        let plan = draft.rewrite(&current, Utc::now());
        state
            .term_rows
            .retain(|r| !(r.category == category && r.key() == key));
        state.term_rows.extend(plan.rows());

        Ok(plan.rows())
    }

    async fn delete_term_group(&self, category: Category, key: RangeKey) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.term_rows.len();
        state
            .term_rows
            .retain(|r| !(r.category == category && r.key() == key));

        let removed = (before - state.term_rows.len()) as u64;
        if removed == 0 {
            return Err(range_not_found(category, key));
        }
        Ok(removed)
    }

    async fn list_legacy_rates(&self) -> Result<Vec<LegacyRate>> {
        let state = self.state.read().await;
        let mut rows = state.legacy.clone();
        rows.sort_by_key(|r| (r.year_from, r.year_to, std::cmp::Reverse(r.priority)));
        Ok(rows)
    }

    async fn active_legacy_rates(&self) -> Result<Vec<LegacyRate>> {
        let state = self.state.read().await;
        Ok(state.legacy.iter().filter(|r| r.is_active).cloned().collect())
    }

    async fn find_legacy_rate(&self, id: Uuid) -> Result<LegacyRate> {
        let state = self.state.read().await;
        state
            .legacy
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| legacy_not_found(id))
    }

    async fn create_legacy_rate(&self, draft: LegacyDraft) -> Result<LegacyRate> {
        let row = draft.new_row(Utc::now());
        self.state.write().await.legacy.push(row.clone());
        Ok(row)
    }

    async fn update_legacy_rate(&self, id: Uuid, draft: LegacyDraft) -> Result<LegacyRate> {
        let mut state = self.state.write().await;
        let slot = state
            .legacy
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| legacy_not_found(id))?;

        *slot = draft.apply(slot, Utc::now());
        Ok(slot.clone())
    }

    async fn delete_legacy_rate(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.legacy.len();
        state.legacy.retain(|r| r.id != id);

        if state.legacy.len() == before {
            return Err(legacy_not_found(id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
