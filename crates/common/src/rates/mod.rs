//! Interest-rate ranges
//!
//! Two rate models live side by side:
//! - the term model: per-category tables where each year span carries a
//!   rate per loan term, and active spans never overlap within a term
//! - the legacy model: single-rate spans that may overlap, settled by
//!   priority at lookup time

pub mod api;
mod format;
mod model;
mod overlap;
mod select;
mod service;
pub mod validate;

pub use format::{format_percent, parse_percent};
pub use model::{
    Category, GroupDraft, GroupRewrite, LegacyDraft, LegacyRate, RangeGroup, RangeKey, RateRange,
};
pub use overlap::{check_group_write, conflicting_terms, intervals_overlap};
pub use select::{count_term_matches, group_ranges, pick_legacy_rate, pick_term_rate};
pub use service::RateService;
pub use validate::{validate_group, validate_legacy};
