//! # Stock Planning
//!
//! Computes the signed stock change per product for each engine operation.
//! Applying the plan is the database's job; this module only decides what
//! the deltas are and whether a snapshot can cover them.
//!
//! ```text
//!   Post  : stock -= quantity
//!   Edit  : stock -= (new_quantity - old_quantity)
//!   Void  : stock += quantity
//! ```
//!
//! Deltas are aggregated per product before anything is checked, so two
//! lines of the same product in one request are validated against their
//! combined quantity.

use std::collections::BTreeMap;

use crate::catalog::CatalogSnapshot;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{SaleDetail, StockLevel};
use crate::validation::{ValidatedEdit, ValidatedSale};

/// Per-product signed stock change. Negative consumes, positive restores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockPlan {
    deltas: BTreeMap<i64, i64>,
}

impl StockPlan {
    pub fn for_post(sale: &ValidatedSale) -> CoreResult<Self> {
        let mut plan = StockPlan::default();
        for line in &sale.lines {
            plan.add(line.product_id, -line.quantity)?;
        }
        Ok(plan)
    }

    pub fn for_edit(edit: &ValidatedEdit) -> CoreResult<Self> {
        let mut plan = StockPlan::default();
        for line in &edit.lines {
            let delta = line
                .old_quantity
                .checked_sub(line.new_quantity)
                .ok_or_else(|| quantity_overflow(line.product_id))?;
            plan.add(line.product_id, delta)?;
        }
        Ok(plan)
    }

    pub fn for_void(before: &SaleDetail) -> CoreResult<Self> {
        let mut plan = StockPlan::default();
        for line in &before.items {
            plan.add(line.item.product_id, line.item.quantity)?;
        }
        Ok(plan)
    }

    /// Net deltas stay strictly above `i64::MIN` so they can always be negated.
    fn add(&mut self, product_id: i64, delta: i64) -> CoreResult<()> {
        let net = self.deltas.entry(product_id).or_insert(0);
        *net = net
            .checked_add(delta)
            .filter(|sum| sum.checked_neg().is_some())
            .ok_or_else(|| quantity_overflow(product_id))?;
        Ok(())
    }

    /// Net delta for a product (0 if untouched).
    pub fn delta(&self, product_id: i64) -> i64 {
        self.deltas.get(&product_id).copied().unwrap_or(0)
    }

    /// Non-zero deltas in product id order.
    ///
    /// The fixed order keeps lock acquisition deterministic on engines that
    /// lock rows.
    pub fn adjustments(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.deltas
            .iter()
            .filter(|(_, delta)| **delta != 0)
            .map(|(product_id, delta)| (*product_id, *delta))
    }

    pub fn is_empty(&self) -> bool {
        self.adjustments().next().is_none()
    }

    /// Verifies that every consuming delta is covered by the snapshot's
    /// stock. Untracked products always pass.
    ///
    /// This is the pre-write check. The database re-checks atomically when
    /// applying, since the snapshot may be stale by then.
    pub fn check(&self, snapshot: &CatalogSnapshot) -> CoreResult<()> {
        for (product_id, delta) in self.adjustments() {
            if delta >= 0 {
                continue;
            }
            let product = snapshot
                .product(product_id)
                .ok_or_else(|| CoreError::not_found("Product", product_id))?;

            if let StockLevel::Tracked(available) = product.stock {
                if !product.stock.covers(-delta) {
                    return Err(CoreError::InsufficientStock {
                        product: product.name.clone(),
                        available,
                        requested: -delta,
                    });
                }
            }
        }
        Ok(())
    }
}

fn quantity_overflow(product_id: i64) -> CoreError {
    ValidationError::invalid_format(
        "items",
        format!("combined quantity for product {product_id} is too large"),
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{Product, Sale, SaleLine, SaleLineItem};
    use crate::validation::{ValidatedLine, ValidatedLineEdit};
    use chrono::Utc;

    fn product(id: i64, stock: StockLevel) -> Product {
        Product {
            id,
            name: format!("P{id}"),
            price_cents: 100,
            variable_price: false,
            stock,
            suspended: false,
            category: None,
        }
    }

    fn line(product_id: i64, quantity: i64) -> ValidatedLine {
        ValidatedLine {
            product_id,
            product_name: format!("P{product_id}"),
            quantity,
            unit_price: Money::from_cents(100),
            is_delivery: false,
            add_ons: vec![],
        }
    }

    fn edit(product_id: i64, old_quantity: i64, new_quantity: i64) -> ValidatedLineEdit {
        ValidatedLineEdit {
            item_id: product_id * 10,
            product_id,
            product_name: format!("P{product_id}"),
            old_quantity,
            new_quantity,
            unit_price: Money::from_cents(100),
            is_delivery: false,
        }
    }

    #[test]
    fn test_post_aggregates_same_product() {
        let sale = ValidatedSale {
            payment_method_id: 1,
            lines: vec![line(1, 2), line(2, 1), line(1, 1)],
        };
        let plan = StockPlan::for_post(&sale).unwrap();
        assert_eq!(plan.delta(1), -3);
        assert_eq!(plan.delta(2), -1);

        let snapshot = CatalogSnapshot::new().with_product(product(1, StockLevel::Tracked(2)));
        let snapshot = snapshot.with_product(product(2, StockLevel::Untracked));
        let err = plan.check(&snapshot).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 2, requested: 3, .. }
        ));
    }

    #[test]
    fn test_untracked_always_covered() {
        let sale = ValidatedSale {
            payment_method_id: 1,
            lines: vec![line(1, 1_000)],
        };
        let snapshot = CatalogSnapshot::new().with_product(product(1, StockLevel::Untracked));
        assert!(StockPlan::for_post(&sale).unwrap().check(&snapshot).is_ok());
    }

    #[test]
    fn test_edit_nets_deltas() {
        let validated = ValidatedEdit {
            payment_method_id: 1,
            lines: vec![edit(1, 2, 1), edit(2, 3, 3), edit(3, 1, 4)],
        };
        let plan = StockPlan::for_edit(&validated).unwrap();
        assert_eq!(plan.delta(1), 1);
        assert_eq!(plan.delta(2), 0);
        assert_eq!(plan.delta(3), -3);
        assert_eq!(plan.adjustments().collect::<Vec<_>>(), vec![(1, 1), (3, -3)]);

        // Restores never need coverage
        let snapshot = CatalogSnapshot::new()
            .with_product(product(1, StockLevel::Tracked(0)))
            .with_product(product(3, StockLevel::Tracked(3)));
        assert!(plan.check(&snapshot).is_ok());
    }

    #[test]
    fn test_zero_delta_edit_is_empty() {
        let validated = ValidatedEdit {
            payment_method_id: 1,
            lines: vec![edit(1, 2, 2)],
        };
        assert!(StockPlan::for_edit(&validated).unwrap().is_empty());
    }

    #[test]
    fn test_void_restores_every_line() {
        let now = Utc::now();
        let item = |id, product_id, quantity| SaleLine {
            item: SaleLineItem {
                id,
                sale_id: 1,
                product_id,
                quantity,
                unit_price_cents: 100,
                is_delivery: false,
            },
            additionals: vec![],
        };
        let before = SaleDetail {
            sale: Sale {
                id: 1,
                user_id: 1,
                payment_method_id: 1,
                total_cents: 500,
                created_at: now,
                updated_at: now,
            },
            items: vec![item(1, 1, 2), item(2, 1, 1), item(3, 2, 2)],
        };

        let plan = StockPlan::for_void(&before).unwrap();
        assert_eq!(plan.adjustments().collect::<Vec<_>>(), vec![(1, 3), (2, 2)]);
    }
}
