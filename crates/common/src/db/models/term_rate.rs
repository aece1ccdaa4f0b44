//! Term-bucketed rate range entity

use crate::errors::AppError;
use crate::rates::{Category, RateRange};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "term_rate_ranges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// `auto` or `moto`
    #[sea_orm(column_type = "Text")]
    pub category: String,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub year_from: i32,

    pub year_to: i32,

    pub term_months: i32,

    #[sea_orm(column_type = "Double")]
    pub interest_rate: f64,

    pub is_active: bool,

    pub priority: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for RateRange {
    type Error = AppError;

    fn try_from(row: Model) -> Result<Self, Self::Error> {
        let category: Category = row.category.parse()?;
        let term_months = u32::try_from(row.term_months).map_err(|_| AppError::Internal {
            message: format!("negative term stored for rate range {}", row.id),
        })?;

        Ok(RateRange {
            id: row.id,
            category,
            name: row.name,
            description: row.description,
            year_from: row.year_from,
            year_to: row.year_to,
            term_months,
            interest_rate: row.interest_rate,
            is_active: row.is_active,
            priority: row.priority,
            created_at: row.created_at.with_timezone(&chrono::Utc),
            updated_at: row.updated_at.with_timezone(&chrono::Utc),
        })
    }
}

impl From<&RateRange> for ActiveModel {
    fn from(range: &RateRange) -> Self {
        ActiveModel {
            id: Set(range.id),
            category: Set(range.category.as_str().to_string()),
            name: Set(range.name.clone()),
            description: Set(range.description.clone()),
            year_from: Set(range.year_from),
            year_to: Set(range.year_to),
            term_months: Set(range.term_months as i32),
            interest_rate: Set(range.interest_rate),
            is_active: Set(range.is_active),
            priority: Set(range.priority),
            created_at: Set(range.created_at.into()),
            updated_at: Set(range.updated_at.into()),
        }
    }
}
