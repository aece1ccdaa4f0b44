//! Single-rate (priority based) range entity

use crate::rates::LegacyRate;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rate_ranges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub year_from: i32,

    pub year_to: i32,

    #[sea_orm(column_type = "Double")]
    pub interest_rate: f64,

    pub is_active: bool,

    /// Higher wins when spans overlap
    pub priority: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for LegacyRate {
    fn from(row: Model) -> Self {
        LegacyRate {
            id: row.id,
            name: row.name,
            description: row.description,
            year_from: row.year_from,
            year_to: row.year_to,
            interest_rate: row.interest_rate,
            is_active: row.is_active,
            priority: row.priority,
            created_at: row.created_at.with_timezone(&chrono::Utc),
            updated_at: row.updated_at.with_timezone(&chrono::Utc),
        }
    }
}

impl From<&LegacyRate> for ActiveModel {
    fn from(rate: &LegacyRate) -> Self {
        ActiveModel {
            id: Set(rate.id),
            name: Set(rate.name.clone()),
            description: Set(rate.description.clone()),
            year_from: Set(rate.year_from),
            year_to: Set(rate.year_to),
            interest_rate: Set(rate.interest_rate),
            is_active: Set(rate.is_active),
            priority: Set(rate.priority),
            created_at: Set(rate.created_at.into()),
            updated_at: Set(rate.updated_at.into()),
        }
    }
}
