//! Postgres-backed rate store
//!
//! Term-model writes run in one transaction holding a per-category
//! advisory lock, so the overlap check and the row changes commit together
//! or not at all. The schema's exclusion constraint backs the check up.

use crate::db::models::*;
use crate::db::store::RateStore;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::rates::{
    check_group_write, Category, GroupDraft, LegacyDraft, LegacyRate, RangeKey, RateRange,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, QueryFilter, QueryOrder, RuntimeErr, SqlErr, Statement,
    TransactionTrait,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Postgres SQLSTATE raised by an `EXCLUDE` constraint
const EXCLUSION_VIOLATION: &str = "23P01";

/// Rate store over the primary/replica pool
#[derive(Clone)]
pub struct PgRateStore {
    pool: DbPool,
}

impl PgRateStore {
    /// Create a new store with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Open a transaction serialized against other writers of `category`
    async fn locked_txn(&self, category: Category) -> Result<DatabaseTransaction> {
        let txn = self.write_conn().begin().await?;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_advisory_xact_lock($1)",
            vec![category.lock_key().into()],
        );
        txn.execute(stmt).await?;

        debug!(category = %category, "Acquired rate table lock");
        Ok(txn)
    }

    async fn category_rows<C: ConnectionTrait>(conn: &C, category: Category) -> Result<Vec<RateRange>> {
        let rows = TermRateEntity::find()
            .filter(TermRateColumn::Category.eq(category.as_str()))
            .order_by_asc(TermRateColumn::YearFrom)
            .order_by_asc(TermRateColumn::YearTo)
            .order_by_asc(TermRateColumn::TermMonths)
            .all(conn)
            .await?;

        rows.into_iter().map(RateRange::try_from).collect()
    }

    async fn insert_row(txn: &DatabaseTransaction, row: &RateRange) -> Result<RateRange> {
        let saved = TermRateActiveModel::from(row)
            .insert(txn)
            .await
            .map_err(|e| write_error(e, row))?;
        RateRange::try_from(saved)
    }

    async fn update_row(txn: &DatabaseTransaction, row: &RateRange) -> Result<RateRange> {
        let saved = TermRateActiveModel::from(row)
            .update(txn)
            .await
            .map_err(|e| write_error(e, row))?;
        RateRange::try_from(saved)
    }
}

fn is_exclusion_violation(err: &DbErr) -> bool {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db))) => {
            db.code().as_deref() == Some(EXCLUSION_VIOLATION)
        }
        _ => false,
    }
}

/// Map constraint failures of a term row write onto domain errors
fn write_error(err: DbErr, row: &RateRange) -> AppError {
    if is_exclusion_violation(&err) {
        warn!(
            category = %row.category,
            term = row.term_months,
            "Exclusion constraint rejected rate range"
        );
        return AppError::Overlap {
            terms: vec![row.term_months],
        };
    }

    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return AppError::Duplicate {
            message: format!("a {} range {} already exists ({})", row.category, row.key(), detail),
        };
    }

    err.into()
}

fn legacy_not_found(id: Uuid) -> AppError {
    AppError::NotFound {
        resource_type: "RateRange".to_string(),
        id: id.to_string(),
    }
}

#[async_trait]
impl RateStore for PgRateStore {
    async fn list_term_ranges(&self, category: Category) -> Result<Vec<RateRange>> {
        Self::category_rows(self.read_conn(), category).await
    }

    async fn active_term_ranges(&self, category: Category, term_months: u32) -> Result<Vec<RateRange>> {
        let rows = TermRateEntity::find()
            .filter(TermRateColumn::Category.eq(category.as_str()))
            .filter(TermRateColumn::TermMonths.eq(term_months as i32))
            .filter(TermRateColumn::IsActive.eq(true))
            .all(self.read_conn())
            .await?;

        rows.into_iter().map(RateRange::try_from).collect()
    }

    async fn find_term_group(&self, category: Category, key: RangeKey) -> Result<Vec<RateRange>> {
        let rows = TermRateEntity::find()
            .filter(TermRateColumn::Category.eq(category.as_str()))
            .filter(TermRateColumn::YearFrom.eq(key.year_from))
            .filter(TermRateColumn::YearTo.eq(key.year_to))
            .order_by_asc(TermRateColumn::TermMonths)
            .all(self.read_conn())
            .await?;

        if rows.is_empty() {
            return Err(AppError::RangeNotFound {
                category: category.to_string(),
                key: key.to_string(),
            });
        }

        rows.into_iter().map(RateRange::try_from).collect()
    }

    async fn create_term_group(&self, draft: GroupDraft) -> Result<Vec<RateRange>> {
        let txn = self.locked_txn(draft.category).await?;

        let existing = Self::category_rows(&txn, draft.category).await?;
        if let Err(e) = check_group_write(&existing, &draft, None) {
            txn.rollback().await?;
            return Err(e);
        }

        let mut saved = Vec::with_capacity(draft.terms.len());
        for row in draft.new_rows(Utc::now()) {
            saved.push(Self::insert_row(&txn, &row).await?);
        }

        txn.commit().await?;
        Ok(saved)
    }

    async fn update_term_group(&self, key: RangeKey, draft: GroupDraft) -> Result<Vec<RateRange>> {
        let category = draft.category;
        let txn = self.locked_txn(category).await?;

        let existing = Self::category_rows(&txn, category).await?;
        let current: Vec<RateRange> = existing.iter().filter(|r| r.key() == key).cloned().collect();
        if current.is_empty() {
            txn.rollback().await?;
            return Err(AppError::RangeNotFound {
                category: category.to_string(),
                key: key.to_string(),
            });
        }

        if let Err(e) = check_group_write(&existing, &draft, Some(key)) {
            txn.rollback().await?;
            return Err(e);
        }

        let plan = draft.rewrite(&current, Utc::now());

        if !plan.removed.is_empty() {
            TermRateEntity::delete_many()
                .filter(TermRateColumn::Id.is_in(plan.removed.clone()))
                .exec(&txn)
                .await?;
        }

        let mut saved = Vec::with_capacity(draft.terms.len());
        for row in &plan.updated {
            saved.push(Self::update_row(&txn, row).await?);
        }
        for row in &plan.inserted {
            saved.push(Self::insert_row(&txn, row).await?);
        }

        txn.commit().await?;

        saved.sort_by_key(|r| r.term_months);
        Ok(saved)
    }

    async fn delete_term_group(&self, category: Category, key: RangeKey) -> Result<u64> {
        let txn = self.locked_txn(category).await?;

        let result = TermRateEntity::delete_many()
            .filter(TermRateColumn::Category.eq(category.as_str()))
            .filter(TermRateColumn::YearFrom.eq(key.year_from))
            .filter(TermRateColumn::YearTo.eq(key.year_to))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(AppError::RangeNotFound {
                category: category.to_string(),
                key: key.to_string(),
            });
        }

        txn.commit().await?;
        Ok(result.rows_affected)
    }

    async fn list_legacy_rates(&self) -> Result<Vec<LegacyRate>> {
        let rows = LegacyRateEntity::find()
            .order_by_asc(LegacyRateColumn::YearFrom)
            .order_by_asc(LegacyRateColumn::YearTo)
            .order_by_desc(LegacyRateColumn::Priority)
            .all(self.read_conn())
            .await?;

        Ok(rows.into_iter().map(LegacyRate::from).collect())
    }

    async fn active_legacy_rates(&self) -> Result<Vec<LegacyRate>> {
        let rows = LegacyRateEntity::find()
            .filter(LegacyRateColumn::IsActive.eq(true))
            .all(self.read_conn())
            .await?;

        Ok(rows.into_iter().map(LegacyRate::from).collect())
    }

    async fn find_legacy_rate(&self, id: Uuid) -> Result<LegacyRate> {
        LegacyRateEntity::find_by_id(id)
            .one(self.read_conn())
            .await?
            .map(LegacyRate::from)
            .ok_or_else(|| legacy_not_found(id))
    }

    async fn create_legacy_rate(&self, draft: LegacyDraft) -> Result<LegacyRate> {
        let row = draft.new_row(Utc::now());
        let saved = LegacyRateActiveModel::from(&row)
            .insert(self.write_conn())
            .await?;
        Ok(saved.into())
    }

    async fn update_legacy_rate(&self, id: Uuid, draft: LegacyDraft) -> Result<LegacyRate> {
        let existing = LegacyRateEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| legacy_not_found(id))?;

        let row = draft.apply(&LegacyRate::from(existing), Utc::now());
        let saved = LegacyRateActiveModel::from(&row)
            .update(self.write_conn())
            .await?;
        Ok(saved.into())
    }

    async fn delete_legacy_rate(&self, id: Uuid) -> Result<()> {
        let result = LegacyRateEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(legacy_not_found(id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
