//! # Domain Types
//!
//! Core domain types used throughout Till POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog (read-only to the engine, except Product.stock)               │
//! │  ┌─────────────────┐   ┌───────────────────┐   ┌───────────────────┐   │
//! │  │    Product      │   │ AdditionalCategory│◄──│  AdditionalItem   │   │
//! │  │  price_cents    │   │  id, name         │   │  price_cents      │   │
//! │  │  variable_price │   └─────────▲─────────┘   │  category_id      │   │
//! │  │  stock          │             │ eligibility └───────────────────┘   │
//! │  └────────┬────────┘─────────────┘ (many-to-many)                      │
//! │           │                                                             │
//! │  Sale aggregate (owned by the engine)                                  │
//! │  ┌────────▼────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │  SaleLineItem   │──►│      Sale       │   │  SaleLineAddOn      │   │
//! │  │  quantity       │   │  total_cents    │   │  quantity           │   │
//! │  │  unit_price ❄   │◄──┼─────────────────┼───│  unit_price ❄       │   │
//! │  │  is_delivery    │   │  user_id        │   └─────────────────────┘   │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ❄ = snapshotted at posting time, never re-read from the catalog       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::UNTRACKED_STOCK;

// =============================================================================
// Stock Level
// =============================================================================

/// Stock state of a product.
///
/// The database stores a single integer where `-1` means "not tracked".
/// Inside the engine the two states are distinct variants so a sentinel can
/// never be mistaken for a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    /// Unlimited; the stock ledger never touches this product.
    Untracked,
    /// A meaningful non-negative count.
    Tracked(i64),
}

impl StockLevel {
    /// Interprets a raw stored value. Any negative value is untracked.
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            StockLevel::Untracked
        } else {
            StockLevel::Tracked(raw)
        }
    }

    /// Returns the value as stored in the database.
    pub fn to_raw(self) -> i64 {
        match self {
            StockLevel::Untracked => UNTRACKED_STOCK,
            StockLevel::Tracked(count) => count,
        }
    }

    #[inline]
    pub fn is_tracked(self) -> bool {
        matches!(self, StockLevel::Tracked(_))
    }

    /// Checks whether `quantity` more units can be taken from this level.
    pub fn covers(self, quantity: i64) -> bool {
        match self {
            StockLevel::Untracked => true,
            StockLevel::Tracked(count) => count >= quantity,
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,

    /// Display name shown to cashier and in error messages.
    pub name: String,

    /// Catalog price in cents. Ignored when `variable_price` is set.
    pub price_cents: i64,

    /// Caller supplies the unit price on every sale line.
    pub variable_price: bool,

    pub stock: StockLevel,

    /// Hidden from catalog listings; still sellable by the engine.
    pub suspended: bool,

    /// Free-text category label (reporting only).
    pub category: Option<String>,
}

impl Product {
    /// Returns the catalog price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Grouping of add-on definitions, e.g. "Sauces".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AdditionalCategory {
    pub id: i64,
    pub name: String,
}

/// An add-on that can be attached to a sale line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AdditionalItem {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub suspended: bool,
    pub category_id: i64,
}

/// A payment method a sale can be settled with ("Cash", "PIX", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
}

// =============================================================================
// Caller
// =============================================================================

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    /// Cashier. `CAIXA` is accepted for tokens issued by older clients.
    #[serde(rename = "CASHIER", alias = "CAIXA")]
    Cashier,
}

/// The authenticated identity a sale operation runs on behalf of.
///
/// Resolved by the routing layer; the engine trusts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub role: Role,
}

impl Caller {
    pub fn admin(user_id: i64) -> Self {
        Caller {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn cashier(user_id: i64) -> Self {
        Caller {
            user_id,
            role: Role::Cashier,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// =============================================================================
// Sale
// =============================================================================

/// Sale header.
///
/// `total_cents` is always derived by the pricing calculator; no request
/// field can set it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: i64,
    pub user_id: i64,
    pub payment_method_id: i64,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item in a sale.
/// Uses snapshot pattern to freeze the resolved price at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLineItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    pub is_delivery: bool,
}

impl SaleLineItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

/// An add-on attached to a sale line, with its frozen price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLineAddOn {
    pub id: i64,
    pub sale_item_id: i64,
    pub additional_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl SaleLineAddOn {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

/// A sale line together with its add-ons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    #[serde(flatten)]
    pub item: SaleLineItem,
    pub additionals: Vec<SaleLineAddOn>,
}

/// The full persisted sale aggregate: header, lines and add-ons.
///
/// This is what post and edit return, and what edit and void load as the
/// "before" state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleLine>,
}

impl SaleDetail {
    /// Finds a line by its SaleLineItem id.
    pub fn line(&self, item_id: i64) -> Option<&SaleLine> {
        self.items.iter().find(|line| line.item.id == item_id)
    }

    /// Distinct product ids referenced by this sale, in line order.
    pub fn product_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::with_capacity(self.items.len());
        for line in &self.items {
            if !ids.contains(&line.item.product_id) {
                ids.push(line.item.product_id);
            }
        }
        ids
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_level_from_raw() {
        assert_eq!(StockLevel::from_raw(-1), StockLevel::Untracked);
        assert_eq!(StockLevel::from_raw(0), StockLevel::Tracked(0));
        assert_eq!(StockLevel::from_raw(5), StockLevel::Tracked(5));
        assert_eq!(StockLevel::Untracked.to_raw(), UNTRACKED_STOCK);
        assert_eq!(StockLevel::Tracked(3).to_raw(), 3);
    }

    #[test]
    fn test_stock_level_covers() {
        assert!(StockLevel::Untracked.covers(1_000_000));
        assert!(StockLevel::Tracked(2).covers(2));
        assert!(!StockLevel::Tracked(2).covers(3));
        assert!(!StockLevel::Tracked(0).covers(1));
    }

    #[test]
    fn test_role_accepts_legacy_cashier_name() {
        let role: Role = serde_json::from_str("\"CAIXA\"").unwrap();
        assert_eq!(role, Role::Cashier);
        let role: Role = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(role, Role::Admin);
        assert!(serde_json::from_str::<Role>("\"root\"").is_err());
    }

    #[test]
    fn test_sale_detail_serializes_flat() {
        let now = Utc::now();
        let detail = SaleDetail {
            sale: Sale {
                id: 7,
                user_id: 1,
                payment_method_id: 2,
                total_cents: 2200,
                created_at: now,
                updated_at: now,
            },
            items: vec![SaleLine {
                item: SaleLineItem {
                    id: 11,
                    sale_id: 7,
                    product_id: 3,
                    quantity: 2,
                    unit_price_cents: 1000,
                    is_delivery: false,
                },
                additionals: vec![],
            }],
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["totalCents"], 2200);
        assert_eq!(json["items"][0]["productId"], 3);
        assert_eq!(json["items"][0]["unitPriceCents"], 1000);
        assert_eq!(detail.product_ids(), vec![3]);
    }
}
