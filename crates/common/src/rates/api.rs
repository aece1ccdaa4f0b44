//! Request and response records for the rate endpoints
//!
//! Shared by the gateway (which validates them at the boundary) and the
//! client (which sends them). Request bodies reject unknown fields.

use super::model::{Category, LegacyRate, RateRange};
use crate::calculator::LoanQuote;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

fn default_active() -> bool {
    true
}

/// Body of `POST`/`PATCH /api/admin/rates/{category}[/{key}]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TermRangeInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub description: Option<String>,

    #[validate(range(min = 1900, max = 2050))]
    pub year_from: i32,

    #[validate(range(min = 1900, max = 2050))]
    pub year_to: i32,

    #[serde(default = "default_active")]
    pub is_active: bool,

    /// Term in months -> annual rate fraction
    pub terms: BTreeMap<u32, f64>,
}

/// Body of `POST /api/admin/rates` and `PATCH /api/admin/rates/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LegacyRateInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub description: Option<String>,

    #[validate(range(min = 1900, max = 2050))]
    pub year_from: i32,

    #[validate(range(min = 1900, max = 2050))]
    pub year_to: i32,

    pub interest_rate: f64,

    #[serde(default = "default_active")]
    pub is_active: bool,

    #[serde(default)]
    pub priority: i32,
}

/// Success envelope: `{success: true, data}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

/// Body returned by deletes: `{success: true}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// Query string of `GET /api/admin/rates/{category}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListQuery {
    /// `groups` returns range groups instead of raw term rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
}

/// Query string of `GET /api/rates/resolve`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveQuery {
    pub category: Category,
    pub year: i32,
    pub term: u32,
}

/// Which rate model answered a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Term,
    Legacy,
}

/// Rate applicable to a vehicle year and loan term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRate {
    pub source: RateSource,
    pub range_id: Uuid,
    pub range_name: String,
    pub year_from: i32,
    pub year_to: i32,
    pub interest_rate: f64,
    /// Percentage string for display, e.g. "45.5"
    pub display: String,
}

impl ResolvedRate {
    pub fn from_term(range: &RateRange) -> Self {
        Self {
            source: RateSource::Term,
            range_id: range.id,
            range_name: range.name.clone(),
            year_from: range.year_from,
            year_to: range.year_to,
            interest_rate: range.interest_rate,
            display: super::format_percent(range.interest_rate),
        }
    }

    pub fn from_legacy(rate: &LegacyRate) -> Self {
        Self {
            source: RateSource::Legacy,
            range_id: rate.id,
            range_name: rate.name.clone(),
            year_from: rate.year_from,
            year_to: rate.year_to,
            interest_rate: rate.interest_rate,
            display: super::format_percent(rate.interest_rate),
        }
    }
}

/// Body of `POST /api/calculator/quote`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuoteRequest {
    pub category: Category,

    pub vehicle_year: i32,

    #[validate(range(exclusive_min = 0.0))]
    pub vehicle_price: f64,

    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub down_payment: f64,

    pub term_months: u32,
}

/// Response data of `POST /api/calculator/quote`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub rate: ResolvedRate,
    pub quote: LoanQuote,
}
