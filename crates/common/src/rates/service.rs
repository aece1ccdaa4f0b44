//! Rate resolver service
//!
//! Validates writes at the boundary, delegates the atomic check-and-write
//! to the store, and answers applicability queries for both rate models.

use super::api::{LegacyRateInput, QuoteRequest, QuoteResponse, ResolvedRate, TermRangeInput};
use super::model::{Category, LegacyRate, RangeGroup, RangeKey, RateRange};
use super::select::{count_term_matches, group_ranges, pick_legacy_rate, pick_term_rate};
use super::validate::{validate_group, validate_legacy};
use crate::calculator::{self, LoanRequest};
use crate::db::RateStore;
use crate::errors::{AppError, Result};
use crate::metrics::{
    record_legacy_resolution, record_overlap_rejection, record_quote, record_rate_write,
    record_resolution,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const TERM_MODEL: &str = "term";
const LEGACY_MODEL: &str = "legacy";

/// Entry point for every rate operation
#[derive(Clone)]
pub struct RateService {
    store: Arc<dyn RateStore>,
    legacy_fallback: bool,
}

fn outcome<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(AppError::Overlap { .. }) => "overlap",
        Err(e) if e.is_not_found() => "not_found",
        Err(e) if e.is_client_error() => "rejected",
        Err(_) => "error",
    }
}

fn single_group(rows: &[RateRange]) -> Result<RangeGroup> {
    group_ranges(rows)
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Internal {
            message: "range write returned no rows".to_string(),
        })
}

impl RateService {
    pub fn new(store: Arc<dyn RateStore>) -> Self {
        Self {
            store,
            legacy_fallback: true,
        }
    }

    /// Whether dealer lookups may fall back to the single-rate table
    pub fn with_legacy_fallback(mut self, enabled: bool) -> Self {
        self.legacy_fallback = enabled;
        self
    }

    pub fn store(&self) -> &Arc<dyn RateStore> {
        &self.store
    }

    fn note_write<T>(&self, category: Option<Category>, model: &str, operation: &str, result: &Result<T>) {
        record_rate_write(model, operation, outcome(result));

        if let (Some(category), Err(AppError::Overlap { terms })) = (category, result) {
            record_overlap_rejection(category.as_str(), terms.len());
            warn!(category = %category, ?terms, operation, "Rate write rejected: overlap");
        }
    }

    // ========================================================================
    // Term model
    // ========================================================================

    /// Active term-model rate applying to `year`, or `RateNotConfigured`
    #[instrument(skip(self))]
    pub async fn resolve(&self, category: Category, year: i32, term_months: u32) -> Result<RateRange> {
        category.require_term(term_months)?;

        let rows = self.store.active_term_ranges(category, term_months).await?;

        let matches = count_term_matches(&rows, category, term_months, year);
        if matches > 1 {
            warn!(
                category = %category,
                year,
                term = term_months,
                matches,
                "Overlapping active ranges found at lookup; applying priority tie-break"
            );
        }

        match pick_term_rate(&rows, category, term_months, year) {
            Some(range) => {
                record_resolution(category.as_str(), "hit");
                debug!(range_id = %range.id, rate = range.interest_rate, "Rate resolved");
                Ok(range.clone())
            }
            None => {
                record_resolution(category.as_str(), "miss");
                Err(AppError::RateNotConfigured {
                    category: category.to_string(),
                    year,
                    term: term_months,
                })
            }
        }
    }

    /// Create one row per term under a new year span
    #[instrument(skip(self, input), fields(year_from = input.year_from, year_to = input.year_to))]
    pub async fn create_range(&self, category: Category, input: TermRangeInput) -> Result<RangeGroup> {
        let draft = validate_group(category, input)?;
        let key = draft.key();

        let result = self.store.create_term_group(draft).await;
        self.note_write(Some(category), TERM_MODEL, "create", &result);

        let group = single_group(&result?)?;
        info!(category = %category, key = %key, terms = group.terms.len(), "Rate range created");
        Ok(group)
    }

    /// Rewrite the group under `key`; the input may move its bounds
    #[instrument(skip(self, key, input), fields(key = %key))]
    pub async fn update_range(
        &self,
        category: Category,
        key: RangeKey,
        input: TermRangeInput,
    ) -> Result<RangeGroup> {
        let draft = validate_group(category, input)?;
        let new_key = draft.key();

        let result = self.store.update_term_group(key, draft).await;
        self.note_write(Some(category), TERM_MODEL, "update", &result);

        let group = single_group(&result?)?;
        info!(category = %category, from = %key, to = %new_key, "Rate range updated");
        Ok(group)
    }

    /// Remove every term row under `key`
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn delete_range(&self, category: Category, key: RangeKey) -> Result<()> {
        let result = self.store.delete_term_group(category, key).await;
        self.note_write(Some(category), TERM_MODEL, "delete", &result);

        let removed = result?;
        info!(category = %category, key = %key, rows = removed, "Rate range deleted");
        Ok(())
    }

    pub async fn list_ranges(&self, category: Category) -> Result<Vec<RateRange>> {
        self.store.list_term_ranges(category).await
    }

    pub async fn list_groups(&self, category: Category) -> Result<Vec<RangeGroup>> {
        let rows = self.store.list_term_ranges(category).await?;
        Ok(group_ranges(&rows))
    }

    pub async fn get_group(&self, category: Category, key: RangeKey) -> Result<RangeGroup> {
        let rows = self.store.find_term_group(category, key).await?;
        single_group(&rows)
    }

    // ========================================================================
    // Legacy model
    // ========================================================================

    pub async fn list_legacy(&self) -> Result<Vec<LegacyRate>> {
        self.store.list_legacy_rates().await
    }

    pub async fn get_legacy(&self, id: Uuid) -> Result<LegacyRate> {
        self.store.find_legacy_rate(id).await
    }

    /// Highest-priority active single-rate row covering `year`
    pub async fn resolve_legacy(&self, year: i32) -> Result<LegacyRate> {
        let rows = self.store.active_legacy_rates().await?;

        match pick_legacy_rate(&rows, year) {
            Some(rate) => {
                record_legacy_resolution("hit");
                Ok(rate.clone())
            }
            None => {
                record_legacy_resolution("miss");
                Err(AppError::NotFound {
                    resource_type: "RateRange".to_string(),
                    id: format!("year {}", year),
                })
            }
        }
    }

    pub async fn create_legacy(&self, input: LegacyRateInput) -> Result<LegacyRate> {
        let draft = validate_legacy(input)?;

        let result = self.store.create_legacy_rate(draft).await;
        self.note_write(None, LEGACY_MODEL, "create", &result);

        let rate = result?;
        info!(id = %rate.id, "Legacy rate created");
        Ok(rate)
    }

    pub async fn update_legacy(&self, id: Uuid, input: LegacyRateInput) -> Result<LegacyRate> {
        let draft = validate_legacy(input)?;

        let result = self.store.update_legacy_rate(id, draft).await;
        self.note_write(None, LEGACY_MODEL, "update", &result);

        let rate = result?;
        info!(id = %rate.id, "Legacy rate updated");
        Ok(rate)
    }

    pub async fn delete_legacy(&self, id: Uuid) -> Result<()> {
        let result = self.store.delete_legacy_rate(id).await;
        self.note_write(None, LEGACY_MODEL, "delete", &result);

        result?;
        info!(id = %id, "Legacy rate deleted");
        Ok(())
    }

    // ========================================================================
    // Dealer lookups
    // ========================================================================

    /// Term model first; the legacy model answers only when no term range applies
    pub async fn quote_rate(&self, category: Category, year: i32, term_months: u32) -> Result<ResolvedRate> {
        match self.resolve(category, year, term_months).await {
            Ok(range) => Ok(ResolvedRate::from_term(&range)),
            Err(e) if e.is_not_found() && self.legacy_fallback => {
                debug!(category = %category, year, "No term range; trying legacy rates");
                match self.resolve_legacy(year).await {
                    Ok(rate) => Ok(ResolvedRate::from_legacy(&rate)),
                    Err(legacy) if legacy.is_not_found() => Err(e),
                    Err(legacy) => Err(legacy),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Price a loan at the rate applicable to the vehicle
    pub async fn quote(&self, request: QuoteRequest) -> Result<QuoteResponse> {
        let rate = self
            .quote_rate(request.category, request.vehicle_year, request.term_months)
            .await?;

        let quote = calculator::quote(&LoanRequest {
            vehicle_price: request.vehicle_price,
            down_payment: request.down_payment,
            term_months: request.term_months,
            annual_rate: rate.interest_rate,
        })?;

        record_quote(request.category.as_str(), request.term_months);
        Ok(QuoteResponse { rate, quote })
    }
}
