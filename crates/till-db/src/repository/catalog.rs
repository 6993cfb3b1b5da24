//! # Catalog Repository
//!
//! Loads catalog snapshots for the sale engine. Also carries the minimal
//! write helpers the seed binary and tests use to populate a catalog;
//! catalog management itself lives outside this service.
//!
//! ## Snapshot Loading
//! ```text
//! CatalogKeys { product_ids, additional_ids, payment_method_id }
//!      │
//!      ├── SELECT ... FROM products WHERE id IN (...)
//!      ├── SELECT ... FROM product_additional_categories WHERE product_id IN (...)
//!      ├── SELECT ... FROM additionals WHERE id IN (...)
//!      └── SELECT id FROM payment_methods WHERE id = ?
//!      │
//!      ▼
//! CatalogSnapshot (only what was found)
//! ```
//!
//! All four reads run on the caller's connection and must share one
//! transaction to see one consistent state. Edits load inside their write
//! transaction; [`CatalogRepository::snapshot`] opens a read transaction
//! for posts, committed before the write transaction begins.

use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{push_id_list, timestamp};
use till_core::{AdditionalCategory, AdditionalItem, CatalogKeys, CatalogSnapshot, PaymentMethod, Product, StockLevel};

// =============================================================================
// Rows
// =============================================================================

/// Raw products row; `stock` still carries the sentinel.
#[derive(Debug, FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price_cents: i64,
    variable_price: bool,
    stock: i64,
    suspended: bool,
    category: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price_cents: row.price_cents,
            variable_price: row.variable_price,
            stock: StockLevel::from_raw(row.stock),
            suspended: row.suspended,
            category: row.category,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, price_cents, variable_price, stock, suspended, category";

/// Input for [`CatalogRepository::insert_product`].
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price_cents: i64,
    pub variable_price: bool,
    pub stock: StockLevel,
    pub category: Option<String>,
}

impl NewProduct {
    /// A fixed-price product with untracked stock.
    pub fn fixed(name: impl Into<String>, price_cents: i64) -> Self {
        NewProduct {
            name: name.into(),
            price_cents,
            variable_price: false,
            stock: StockLevel::Untracked,
            category: None,
        }
    }

    /// A variable-price product with untracked stock.
    pub fn variable(name: impl Into<String>) -> Self {
        NewProduct {
            name: name.into(),
            price_cents: 0,
            variable_price: true,
            stock: StockLevel::Untracked,
            category: None,
        }
    }

    /// Starts tracking stock at `count`.
    pub fn stock(mut self, count: i64) -> Self {
        self.stock = StockLevel::Tracked(count);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

// =============================================================================
// Snapshot Loader
// =============================================================================

/// Loads the catalog rows a request references.
///
/// Missing ids are simply absent from the snapshot; the validator decides
/// which error that becomes.
pub async fn load_snapshot(conn: &mut SqliteConnection, keys: &CatalogKeys) -> DbResult<CatalogSnapshot> {
    let mut snapshot = CatalogSnapshot::new();

    if !keys.product_ids.is_empty() {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
        push_id_list(&mut builder, keys.product_ids.iter().copied());
        let products = builder.build_query_as::<ProductRow>().fetch_all(&mut *conn).await?;
        for row in products {
            snapshot.insert_product(row.into());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT product_id, additional_category_id FROM product_additional_categories WHERE product_id IN (",
        );
        push_id_list(&mut builder, keys.product_ids.iter().copied());
        let links = builder.build_query_as::<(i64, i64)>().fetch_all(&mut *conn).await?;
        for (product_id, category_id) in links {
            snapshot.insert_eligibility(product_id, category_id);
        }
    }

    if !keys.additional_ids.is_empty() {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, name, price_cents, suspended, category_id FROM additionals WHERE id IN (",
        );
        push_id_list(&mut builder, keys.additional_ids.iter().copied());
        let additionals = builder.build_query_as::<AdditionalItem>().fetch_all(&mut *conn).await?;
        for additional in additionals {
            snapshot.insert_additional(additional);
        }
    }

    if let Some(payment_method_id) = keys.payment_method_id {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM payment_methods WHERE id = ?1")
            .bind(payment_method_id)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(id) = found {
            snapshot.insert_payment_method(id);
        }
    }

    debug!(
        requested_products = keys.product_ids.len(),
        loaded_products = snapshot.product_count(),
        additionals = keys.additional_ids.len(),
        "Catalog snapshot loaded"
    );

    Ok(snapshot)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reads and seeding.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Loads a snapshot in its own read transaction.
    pub async fn snapshot(&self, keys: &CatalogKeys) -> DbResult<CatalogSnapshot> {
        let mut tx = self.pool.begin().await?;
        let snapshot = load_snapshot(&mut tx, keys).await?;
        tx.commit().await?;
        Ok(snapshot)
    }

    /// Current stock of a product.
    pub async fn product_stock(&self, id: i64) -> DbResult<StockLevel> {
        let raw: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        raw.map(StockLevel::from_raw)
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts products (seed uses it to skip a populated database).
    pub async fn count_products(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Seeding helpers
    // -------------------------------------------------------------------------

    pub async fn insert_payment_method(&self, name: &str) -> DbResult<PaymentMethod> {
        let method = sqlx::query_as::<_, PaymentMethod>("INSERT INTO payment_methods (name) VALUES (?1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(method)
    }

    pub async fn insert_product(&self, product: &NewProduct) -> DbResult<Product> {
        debug!(name = %product.name, stock = product.stock.to_raw(), "Inserting product");

        let now = timestamp(Utc::now());
        let row: ProductRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO products (name, price_cents, variable_price, stock, suspended, category, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?6)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.variable_price)
        .bind(product.stock.to_raw())
        .bind(&product.category)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Sets a product's stock outside any sale (catalog adjustment).
    pub async fn set_stock(&self, product_id: i64, stock: StockLevel) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET stock = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(stock.to_raw())
            .bind(timestamp(Utc::now()))
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }
        Ok(())
    }

    pub async fn insert_additional_category(&self, name: &str) -> DbResult<AdditionalCategory> {
        let category = sqlx::query_as::<_, AdditionalCategory>(
            "INSERT INTO additional_categories (name) VALUES (?1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    pub async fn insert_additional(&self, name: &str, price_cents: i64, category_id: i64) -> DbResult<AdditionalItem> {
        let additional = sqlx::query_as::<_, AdditionalItem>(
            r#"
            INSERT INTO additionals (name, price_cents, suspended, category_id)
            VALUES (?1, ?2, 0, ?3)
            RETURNING id, name, price_cents, suspended, category_id
            "#,
        )
        .bind(name)
        .bind(price_cents)
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(additional)
    }

    /// Adds an add-on category to a product's eligibility set.
    pub async fn allow_category(&self, product_id: i64, category_id: i64) -> DbResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO product_additional_categories (product_id, additional_category_id) VALUES (?1, ?2)",
        )
        .bind(product_id)
        .bind(category_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_snapshot_contains_only_found_rows() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();

        let cash = catalog.insert_payment_method("Cash").await.unwrap();
        let burger = catalog
            .insert_product(&NewProduct::fixed("Burger", 1000).stock(5))
            .await
            .unwrap();
        let toppings = catalog.insert_additional_category("Toppings").await.unwrap();
        let cheese = catalog.insert_additional("Extra cheese", 200, toppings.id).await.unwrap();
        catalog.allow_category(burger.id, toppings.id).await.unwrap();

        let keys = CatalogKeys {
            product_ids: [burger.id, 999].into_iter().collect(),
            additional_ids: [cheese.id].into_iter().collect(),
            payment_method_id: Some(cash.id),
        };
        let snapshot = catalog.snapshot(&keys).await.unwrap();

        assert_eq!(snapshot.product(burger.id).unwrap().stock, StockLevel::Tracked(5));
        assert!(snapshot.product(999).is_none());
        assert!(snapshot.additional(cheese.id).is_some());
        assert!(snapshot.is_eligible(burger.id, toppings.id));
        assert!(snapshot.has_payment_method(cash.id));
    }

    #[tokio::test]
    async fn test_untracked_sentinel_round_trips() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();

        let open = catalog.insert_product(&NewProduct::variable("Open item")).await.unwrap();
        assert_eq!(open.stock, StockLevel::Untracked);
        assert!(open.variable_price);
        assert_eq!(catalog.product_stock(open.id).await.unwrap(), StockLevel::Untracked);

        let raw: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(open.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(raw, till_core::UNTRACKED_STOCK);
    }
}
