//! # Sale Repository
//!
//! Reads and transactional writes for sales, sale lines and line add-ons.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. POST                                                               │
//! │     └── insert_sale() → Sale { total_cents }                           │
//! │     └── insert_line() → SaleLineItem + SaleLineAddOn rows              │
//! │                                                                         │
//! │  2. EDIT (any number of times)                                         │
//! │     └── touch_sale()  → takes the writer lock, proves existence        │
//! │     └── update_line() → quantity / price / delivery flag               │
//! │     └── update_header() → recomputed total, payment method             │
//! │                                                                         │
//! │  3. VOID                                                               │
//! │     └── delete_sale() → add-ons, lines, header (children first)        │
//! │                                                                         │
//! │  Every write takes `&mut SqliteConnection`; the engine passes its      │
//! │  open transaction so one operation is one commit.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{push_id_list, timestamp};
use till_core::{Money, Sale, SaleDetail, SaleFilter, SaleLine, SaleLineAddOn, SaleLineItem, ValidatedLine, ValidatedLineEdit};

/// Repository for sale reads.
///
/// Writes are free functions below, called by the engine inside its
/// transaction.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale with its lines and add-ons.
    pub async fn get(&self, id: i64) -> DbResult<Option<SaleDetail>> {
        let mut conn = self.pool.acquire().await?;
        load_detail(&mut conn, id).await
    }

    /// Lists sales matching `filter`, newest first.
    ///
    /// `owner` restricts the result to one user's sales.
    pub async fn list(&self, filter: &SaleFilter, owner: Option<i64>) -> DbResult<Vec<SaleDetail>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT s.id, s.user_id, s.payment_method_id, s.total_cents, s.created_at, s.updated_at \
             FROM sales s WHERE 1 = 1",
        );

        if let Some(user_id) = owner {
            builder.push(" AND s.user_id = ").push_bind(user_id);
        }
        if let Some(payment_method_id) = filter.payment_method_id {
            builder.push(" AND s.payment_method_id = ").push_bind(payment_method_id);
        }
        if let Some(start) = filter.start {
            builder.push(" AND s.created_at >= ").push_bind(timestamp(start));
        }
        if let Some(end) = filter.end {
            builder.push(" AND s.created_at <= ").push_bind(timestamp(end));
        }
        if let Some(product_id) = filter.product_id {
            builder
                .push(" AND EXISTS (SELECT 1 FROM sale_items i WHERE i.sale_id = s.id AND i.product_id = ")
                .push_bind(product_id)
                .push(")");
        }
        builder.push(" ORDER BY s.created_at DESC, s.id DESC");

        // One read transaction so headers and lines agree
        let mut tx = self.pool.begin().await?;
        let sales = builder.build_query_as::<Sale>().fetch_all(&mut *tx).await?;
        let ids: Vec<i64> = sales.iter().map(|sale| sale.id).collect();
        let mut lines = load_lines(&mut tx, &ids).await?;
        tx.commit().await?;

        debug!(count = sales.len(), ?owner, "Listed sales");

        Ok(sales
            .into_iter()
            .map(|sale| SaleDetail {
                items: lines.remove(&sale.id).unwrap_or_default(),
                sale,
            })
            .collect())
    }

    /// Counts sale headers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Counts `(line items, line add-ons)` rows belonging to a sale id.
    pub async fn count_rows(&self, sale_id: i64) -> DbResult<(i64, i64)> {
        let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE sale_id = ?1")
            .bind(sale_id)
            .fetch_one(&self.pool)
            .await?;
        let add_ons: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sale_item_additionals a JOIN sale_items i ON i.id = a.sale_item_id WHERE i.sale_id = ?1",
        )
        .bind(sale_id)
        .fetch_one(&self.pool)
        .await?;
        Ok((items, add_ons))
    }
}

// =============================================================================
// Reads on a connection
// =============================================================================

/// Loads a sale aggregate on the given connection.
pub async fn load_detail(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Option<SaleDetail>> {
    let sale = sqlx::query_as::<_, Sale>(
        "SELECT id, user_id, payment_method_id, total_cents, created_at, updated_at FROM sales WHERE id = ?1",
    )
    .bind(sale_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(sale) = sale else {
        return Ok(None);
    };

    let mut lines = load_lines(conn, &[sale.id]).await?;
    Ok(Some(SaleDetail {
        items: lines.remove(&sale.id).unwrap_or_default(),
        sale,
    }))
}

/// Loads lines with add-ons for many sales, grouped by sale id.
async fn load_lines(conn: &mut SqliteConnection, sale_ids: &[i64]) -> DbResult<HashMap<i64, Vec<SaleLine>>> {
    let mut grouped: HashMap<i64, Vec<SaleLine>> = HashMap::new();
    if sale_ids.is_empty() {
        return Ok(grouped);
    }

    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT id, sale_id, product_id, quantity, unit_price_cents, is_delivery FROM sale_items WHERE sale_id IN (",
    );
    push_id_list(&mut builder, sale_ids.iter().copied());
    builder.push(" ORDER BY id");
    let items = builder.build_query_as::<SaleLineItem>().fetch_all(&mut *conn).await?;

    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT a.id, a.sale_item_id, a.additional_id, a.quantity, a.unit_price_cents \
         FROM sale_item_additionals a JOIN sale_items i ON i.id = a.sale_item_id WHERE i.sale_id IN (",
    );
    push_id_list(&mut builder, sale_ids.iter().copied());
    builder.push(" ORDER BY a.id");
    let add_ons = builder.build_query_as::<SaleLineAddOn>().fetch_all(&mut *conn).await?;

    let mut add_ons_by_item: HashMap<i64, Vec<SaleLineAddOn>> = HashMap::new();
    for add_on in add_ons {
        add_ons_by_item.entry(add_on.sale_item_id).or_default().push(add_on);
    }

    for item in items {
        let additionals = add_ons_by_item.remove(&item.id).unwrap_or_default();
        grouped
            .entry(item.sale_id)
            .or_default()
            .push(SaleLine { item, additionals });
    }

    Ok(grouped)
}

// =============================================================================
// Writes on a transaction
// =============================================================================

/// Bumps `updated_at`. Returns false if the sale does not exist.
///
/// Used as the first statement of edit and void: it takes SQLite's writer
/// lock before anything is read, so the "before" state loaded next cannot
/// be changed by a concurrent writer.
pub async fn touch_sale(conn: &mut SqliteConnection, sale_id: i64, now: DateTime<Utc>) -> DbResult<bool> {
    let result = sqlx::query("UPDATE sales SET updated_at = ?1 WHERE id = ?2")
        .bind(timestamp(now))
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Inserts a sale header.
pub async fn insert_sale(
    conn: &mut SqliteConnection,
    user_id: i64,
    payment_method_id: i64,
    total: Money,
    now: DateTime<Utc>,
) -> DbResult<Sale> {
    let sale = sqlx::query_as::<_, Sale>(
        r#"
        INSERT INTO sales (user_id, payment_method_id, total_cents, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        RETURNING id, user_id, payment_method_id, total_cents, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(payment_method_id)
    .bind(total.cents())
    .bind(timestamp(now))
    .fetch_one(&mut *conn)
    .await?;

    debug!(sale_id = sale.id, total = %total, "Inserted sale header");
    Ok(sale)
}

/// Inserts one validated line and its add-ons with their frozen prices.
pub async fn insert_line(conn: &mut SqliteConnection, sale_id: i64, line: &ValidatedLine) -> DbResult<SaleLine> {
    let item = sqlx::query_as::<_, SaleLineItem>(
        r#"
        INSERT INTO sale_items (sale_id, product_id, quantity, unit_price_cents, is_delivery)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id, sale_id, product_id, quantity, unit_price_cents, is_delivery
        "#,
    )
    .bind(sale_id)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price.cents())
    .bind(line.is_delivery)
    .fetch_one(&mut *conn)
    .await?;

    let mut additionals = Vec::with_capacity(line.add_ons.len());
    for add_on in &line.add_ons {
        let row = sqlx::query_as::<_, SaleLineAddOn>(
            r#"
            INSERT INTO sale_item_additionals (sale_item_id, additional_id, quantity, unit_price_cents)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, sale_item_id, additional_id, quantity, unit_price_cents
            "#,
        )
        .bind(item.id)
        .bind(add_on.additional_id)
        .bind(add_on.quantity)
        .bind(add_on.unit_price.cents())
        .fetch_one(&mut *conn)
        .await?;
        additionals.push(row);
    }

    debug!(sale_id, item_id = item.id, product_id = item.product_id, add_ons = additionals.len(), "Inserted sale line");
    Ok(SaleLine { item, additionals })
}

/// Applies an edited line's new quantity, price and delivery flag.
pub async fn update_line(conn: &mut SqliteConnection, sale_id: i64, line: &ValidatedLineEdit) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE sale_items
        SET quantity = ?1, unit_price_cents = ?2, is_delivery = ?3
        WHERE id = ?4 AND sale_id = ?5
        "#,
    )
    .bind(line.new_quantity)
    .bind(line.unit_price.cents())
    .bind(line.is_delivery)
    .bind(line.item_id)
    .bind(sale_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("SaleItem", line.item_id));
    }
    Ok(())
}

/// Stores a recomputed total and the (possibly new) payment method.
pub async fn update_header(
    conn: &mut SqliteConnection,
    sale_id: i64,
    payment_method_id: i64,
    total: Money,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE sales SET payment_method_id = ?1, total_cents = ?2, updated_at = ?3 WHERE id = ?4",
    )
    .bind(payment_method_id)
    .bind(total.cents())
    .bind(timestamp(now))
    .bind(sale_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", sale_id));
    }
    Ok(())
}

/// Deletes a sale's add-ons, lines and header, children first.
pub async fn delete_sale(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<()> {
    let add_ons = sqlx::query(
        "DELETE FROM sale_item_additionals WHERE sale_item_id IN (SELECT id FROM sale_items WHERE sale_id = ?1)",
    )
    .bind(sale_id)
    .execute(&mut *conn)
    .await?;

    let items = sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    let header = sqlx::query("DELETE FROM sales WHERE id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    if header.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", sale_id));
    }

    debug!(
        sale_id,
        items = items.rows_affected(),
        add_ons = add_ons.rows_affected(),
        "Deleted sale rows"
    );
    Ok(())
}
