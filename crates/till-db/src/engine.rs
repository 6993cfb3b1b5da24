//! # Sale Engine
//!
//! Post, edit and void as single SQLite transactions.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST                                                                  │
//! │    snapshot (read tx) → validate_sale → price                          │
//! │    BEGIN                                                                │
//! │      apply_plan (first statement is a write: takes the writer lock)    │
//! │      insert_sale → insert_line × N                                     │
//! │    COMMIT                                                               │
//! │                                                                         │
//! │  EDIT                                                                  │
//! │    BEGIN                                                                │
//! │      touch_sale (write first) → load_detail → ensure_can_edit          │
//! │      load_snapshot → validate_edit → apply_plan                        │
//! │      update_line × N → update_header (recomputed total)                │
//! │    COMMIT                                                               │
//! │                                                                         │
//! │  VOID                                                                  │
//! │    ensure_can_void                                                     │
//! │    BEGIN                                                                │
//! │      touch_sale → load_detail → apply_plan (restore) → delete_sale     │
//! │    COMMIT                                                               │
//! │                                                                         │
//! │  Any error drops the transaction, which rolls it back.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Starting every write transaction with a write means SQLite hands out
//! the writer lock before anything is read inside it. Concurrent writers
//! wait on `busy_timeout` and then see the committed state, so two sales
//! can never both take the last unit.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::repository::catalog::{load_snapshot, CatalogRepository};
use crate::repository::sale::{
    delete_sale, insert_line, insert_sale, load_detail, touch_sale, update_header, update_line, SaleRepository,
};
use crate::repository::stock::apply_plan;
use till_core::pricing::sale_total;
use till_core::validation::{validate_edit, validate_sale};
use till_core::{
    policy, CatalogKeys, Caller, CoreError, EditSaleRequest, SaleDetail, SaleFilter, SaleRequest, StockPlan,
};

/// Runs sale operations against the database.
///
/// Cheap to clone; shares the pool.
#[derive(Debug, Clone)]
pub struct SaleEngine {
    pool: SqlitePool,
}

impl SaleEngine {
    pub fn new(pool: SqlitePool) -> Self {
        SaleEngine { pool }
    }

    /// Records a new sale, deducting tracked stock.
    pub async fn post(&self, caller: &Caller, request: &SaleRequest) -> EngineResult<SaleDetail> {
        report("post", self.try_post(caller, request).await)
    }

    /// Changes quantities, prices or delivery flags of existing lines and/or
    /// the payment method, reconciling stock by the net difference.
    pub async fn edit(&self, caller: &Caller, sale_id: i64, request: &EditSaleRequest) -> EngineResult<SaleDetail> {
        report("edit", self.try_edit(caller, sale_id, request).await)
    }

    /// Deletes a sale and returns its quantities to tracked stock.
    pub async fn void(&self, caller: &Caller, sale_id: i64) -> EngineResult<()> {
        report("void", self.try_void(caller, sale_id).await)
    }

    /// Fetches one sale the caller may see.
    pub async fn get(&self, caller: &Caller, sale_id: i64) -> EngineResult<SaleDetail> {
        let mut conn = self.pool.acquire().await?;
        let detail = load_detail(&mut conn, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;
        policy::ensure_can_view(caller, &detail.sale)?;
        Ok(detail)
    }

    /// Lists sales the caller may see, newest first.
    pub async fn list(&self, caller: &Caller, filter: &SaleFilter) -> EngineResult<Vec<SaleDetail>> {
        let sales = SaleRepository::new(self.pool.clone())
            .list(filter, policy::visible_owner(caller))
            .await?;
        Ok(sales)
    }

    async fn try_post(&self, caller: &Caller, request: &SaleRequest) -> EngineResult<SaleDetail> {
        // Read transaction of its own, finished before the write BEGIN
        let snapshot = CatalogRepository::new(self.pool.clone())
            .snapshot(&CatalogKeys::for_sale(request))
            .await?;
        let validated = validate_sale(request, &snapshot)?;
        let plan = StockPlan::for_post(&validated)?;
        let total = validated.total();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        apply_plan(&mut tx, &plan).await?;

        let sale = insert_sale(&mut tx, caller.user_id, validated.payment_method_id, total, now).await?;
        let mut items = Vec::with_capacity(validated.lines.len());
        for line in &validated.lines {
            items.push(insert_line(&mut tx, sale.id, line).await?);
        }

        tx.commit().await?;

        info!(
            sale_id = sale.id,
            user_id = caller.user_id,
            lines = items.len(),
            total = %total,
            "Sale posted"
        );

        Ok(SaleDetail { sale, items })
    }

    async fn try_edit(&self, caller: &Caller, sale_id: i64, request: &EditSaleRequest) -> EngineResult<SaleDetail> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if !touch_sale(&mut tx, sale_id, now).await? {
            return Err(CoreError::not_found("Sale", sale_id).into());
        }
        let before = load_detail(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;
        policy::ensure_can_edit(caller, &before.sale)?;

        let snapshot = load_snapshot(&mut tx, &CatalogKeys::for_edit(&before, request)).await?;
        let edit = validate_edit(&before, request, &snapshot)?;

        apply_plan(&mut tx, &StockPlan::for_edit(&edit)?).await?;

        let mut after = before;
        for change in &edit.lines {
            update_line(&mut tx, sale_id, change).await?;
            if let Some(line) = after.items.iter_mut().find(|line| line.item.id == change.item_id) {
                line.item.quantity = change.new_quantity;
                line.item.unit_price_cents = change.unit_price.cents();
                line.item.is_delivery = change.is_delivery;
            }
        }

        let total = sale_total(&after.items);
        update_header(&mut tx, sale_id, edit.payment_method_id, total, now).await?;

        tx.commit().await?;

        after.sale.payment_method_id = edit.payment_method_id;
        after.sale.total_cents = total.cents();
        after.sale.updated_at = now;

        info!(
            sale_id,
            user_id = caller.user_id,
            changed_lines = edit.lines.len(),
            total = %total,
            "Sale edited"
        );

        Ok(after)
    }

    async fn try_void(&self, caller: &Caller, sale_id: i64) -> EngineResult<()> {
        policy::ensure_can_void(caller)?;

        let mut tx = self.pool.begin().await?;

        if !touch_sale(&mut tx, sale_id, Utc::now()).await? {
            return Err(CoreError::not_found("Sale", sale_id).into());
        }
        let before = load_detail(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        apply_plan(&mut tx, &StockPlan::for_void(&before)?).await?;
        delete_sale(&mut tx, sale_id).await?;

        tx.commit().await?;

        info!(
            sale_id,
            user_id = caller.user_id,
            lines = before.items.len(),
            total = %before.sale.total(),
            "Sale voided"
        );

        Ok(())
    }
}

/// Logs a failed operation at the level its kind deserves.
fn report<T>(operation: &'static str, result: EngineResult<T>) -> EngineResult<T> {
    match &result {
        Err(EngineError::Core(err)) => warn!(operation, error = %err, "Sale operation rejected"),
        Err(EngineError::PersistenceFailure(err)) => error!(operation, error = %err, "Sale operation failed"),
        Ok(_) => {}
    }
    result
}
