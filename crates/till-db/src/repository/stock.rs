//! # Stock Ledger
//!
//! Applies a [`StockPlan`] to the `products` table inside the caller's
//! transaction.
//!
//! ## Compare-and-Adjust
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ Read stock, check in Rust, write absolute value                │
//! │     two writers both read 2, both write 0 → oversold               │
//! │                                                                     │
//! │  ✅ One guarded statement per product                              │
//! │     UPDATE products SET stock = stock + Δ                          │
//! │     WHERE id = ? AND stock >= 0 AND stock + Δ >= 0                 │
//! │                                                                     │
//! │  0 rows → look at the row:                                          │
//! │     missing          → NotFound                                     │
//! │     stock = -1       → untracked, nothing to do                     │
//! │     otherwise        → InsufficientStock (someone else won)         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::error::EngineResult;
use crate::repository::timestamp;
use till_core::{CoreError, StockPlan};

/// Applies every non-zero delta of `plan`, in product id order.
///
/// Any failure leaves the transaction to be rolled back by the caller.
pub async fn apply_plan(conn: &mut SqliteConnection, plan: &StockPlan) -> EngineResult<()> {
    let now = timestamp(Utc::now());

    for (product_id, delta) in plan.adjustments() {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?1, updated_at = ?2
            WHERE id = ?3 AND stock >= 0 AND stock + ?1 >= 0
            "#,
        )
        .bind(delta)
        .bind(&now)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            debug!(product_id, delta, "Stock adjusted");
            continue;
        }

        let row: Option<(String, i64)> = sqlx::query_as("SELECT name, stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            None => return Err(CoreError::not_found("Product", product_id).into()),
            Some((_, stock)) if stock < 0 => {
                debug!(product_id, delta, "Untracked stock, skipped");
            }
            Some((name, stock)) => {
                warn!(product_id, stock, delta, "Stock guard rejected adjustment");
                return Err(CoreError::InsufficientStock {
                    product: name,
                    available: stock,
                    requested: -delta,
                }
                .into());
            }
        }
    }

    Ok(())
}
