//! Storage abstraction for the rate tables

use crate::errors::Result;
use crate::rates::{Category, GroupDraft, LegacyDraft, LegacyRate, RangeKey, RateRange};
use async_trait::async_trait;
use uuid::Uuid;

/// Backing store of both rate models.
///
/// Term-model writes are all-or-nothing: an implementation runs the
/// overlap check and the row changes as one serialized unit per category,
/// so a check can never be invalidated by a concurrent writer before the
/// rows land.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Every term row of a category, ordered by span then term
    async fn list_term_ranges(&self, category: Category) -> Result<Vec<RateRange>>;

    /// Active term rows of one category and term
    async fn active_term_ranges(&self, category: Category, term_months: u32) -> Result<Vec<RateRange>>;

    /// Rows of one group; `RangeNotFound` when the key matches nothing
    async fn find_term_group(&self, category: Category, key: RangeKey) -> Result<Vec<RateRange>>;

    /// Insert one row per draft term, returning the new rows
    async fn create_term_group(&self, draft: GroupDraft) -> Result<Vec<RateRange>>;

    /// Rewrite every row under `key` onto the draft, returning the group's rows
    async fn update_term_group(&self, key: RangeKey, draft: GroupDraft) -> Result<Vec<RateRange>>;

    /// Remove every row under `key`, returning how many were removed
    async fn delete_term_group(&self, category: Category, key: RangeKey) -> Result<u64>;

    /// Every single-rate row, ordered by span
    async fn list_legacy_rates(&self) -> Result<Vec<LegacyRate>>;

    /// Active single-rate rows
    async fn active_legacy_rates(&self) -> Result<Vec<LegacyRate>>;

    /// One single-rate row; `NotFound` for an unknown id
    async fn find_legacy_rate(&self, id: Uuid) -> Result<LegacyRate>;

    async fn create_legacy_rate(&self, draft: LegacyDraft) -> Result<LegacyRate>;

    async fn update_legacy_rate(&self, id: Uuid, draft: LegacyDraft) -> Result<LegacyRate>;

    async fn delete_legacy_rate(&self, id: Uuid) -> Result<()>;

    /// Check the backend is reachable
    async fn ping(&self) -> Result<()>;

    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;
}
