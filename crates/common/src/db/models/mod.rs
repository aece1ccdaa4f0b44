//! SeaORM entity models
//!
//! Database entities for the two rate tables

mod legacy_rate;
mod term_rate;

pub use term_rate::{
    Entity as TermRateEntity,
    ActiveModel as TermRateActiveModel,
    Column as TermRateColumn,
};

pub use legacy_rate::{
    Entity as LegacyRateEntity,
    ActiveModel as LegacyRateActiveModel,
    Column as LegacyRateColumn,
};
