//! # Pricing Calculator
//!
//! Pure functions that turn resolved unit prices and quantities into line
//! subtotals and a sale total.
//!
//! ## Formula
//! ```text
//! line subtotal = unit_price × quantity + Σ (add-on unit_price × add-on quantity)
//! sale total    = Σ line subtotal
//! ```
//!
//! Inputs are already integer cents (decimal input was rounded once by
//! [`Money::from_decimal`]), so every step here is exact and the same lines
//! always produce the same total, whether posting, editing or reconciling.

use crate::money::Money;
use crate::types::{Product, SaleLine};
use crate::validation::ValidatedLine;

/// Anything that can be priced as a sale line.
///
/// Implemented for validated request lines (before persisting) and for
/// persisted lines (when recomputing after an edit), so both paths share one
/// formula.
pub trait LineAmount {
    /// Frozen unit price of the line.
    fn unit_price(&self) -> Money;

    fn quantity(&self) -> i64;

    /// Sum of the line's add-on amounts.
    fn add_ons_amount(&self) -> Money;

    fn subtotal(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity()) + self.add_ons_amount()
    }
}

impl LineAmount for ValidatedLine {
    fn unit_price(&self) -> Money {
        self.unit_price
    }

    fn quantity(&self) -> i64 {
        self.quantity
    }

    fn add_ons_amount(&self) -> Money {
        self.add_ons
            .iter()
            .map(|add_on| add_on.unit_price.multiply_quantity(add_on.quantity))
            .sum()
    }
}

impl LineAmount for SaleLine {
    fn unit_price(&self) -> Money {
        self.item.unit_price()
    }

    fn quantity(&self) -> i64 {
        self.item.quantity
    }

    fn add_ons_amount(&self) -> Money {
        self.additionals
            .iter()
            .map(|add_on| add_on.unit_price().multiply_quantity(add_on.quantity))
            .sum()
    }
}

/// Sums line subtotals into a sale total.
pub fn sale_total<'a, L, I>(lines: I) -> Money
where
    L: LineAmount + 'a,
    I: IntoIterator<Item = &'a L>,
{
    lines.into_iter().map(LineAmount::subtotal).sum()
}

/// Resolves the unit price to freeze on a new line.
///
/// Variable-price products take the caller's price; fixed-price products
/// always take the catalog price and ignore whatever the caller sent.
/// Returns `None` when a variable-price product has no caller price.
pub fn resolve_unit_price(product: &Product, supplied: Option<Money>) -> Option<Money> {
    if product.variable_price {
        supplied
    } else {
        Some(product.price())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SaleLineAddOn, SaleLineItem, StockLevel};
    use crate::validation::ValidatedAddOn;

    fn fixed(price_cents: i64) -> Product {
        Product {
            id: 1,
            name: "Burger".to_string(),
            price_cents,
            variable_price: false,
            stock: StockLevel::Tracked(5),
            suspended: false,
            category: None,
        }
    }

    fn line(unit_cents: i64, quantity: i64, add_ons: Vec<(i64, i64)>) -> ValidatedLine {
        ValidatedLine {
            product_id: 1,
            product_name: "Burger".to_string(),
            quantity,
            unit_price: Money::from_cents(unit_cents),
            is_delivery: false,
            add_ons: add_ons
                .into_iter()
                .map(|(cents, quantity)| ValidatedAddOn {
                    additional_id: 9,
                    quantity,
                    unit_price: Money::from_cents(cents),
                })
                .collect(),
        }
    }

    #[test]
    fn test_line_with_add_on() {
        // 2 × 10.00 + 1 × 2.00
        let line = line(1000, 2, vec![(200, 1)]);
        assert_eq!(line.subtotal(), Money::from_cents(2200));
    }

    #[test]
    fn test_sale_total_sums_lines() {
        let lines = vec![line(1550, 3, vec![]), line(1000, 1, vec![(150, 2), (0, 1)])];
        assert_eq!(sale_total(&lines), Money::from_cents(4650 + 1300));
        assert_eq!(sale_total(&Vec::<ValidatedLine>::new()), Money::zero());
    }

    #[test]
    fn test_persisted_line_priced_the_same() {
        let validated = line(1000, 2, vec![(200, 1)]);
        let persisted = SaleLine {
            item: SaleLineItem {
                id: 1,
                sale_id: 1,
                product_id: 1,
                quantity: 2,
                unit_price_cents: 1000,
                is_delivery: false,
            },
            additionals: vec![SaleLineAddOn {
                id: 1,
                sale_item_id: 1,
                additional_id: 9,
                quantity: 1,
                unit_price_cents: 200,
            }],
        };
        assert_eq!(persisted.subtotal(), validated.subtotal());
    }

    #[test]
    fn test_resolve_unit_price() {
        let product = fixed(1000);
        assert_eq!(
            resolve_unit_price(&product, Some(Money::from_cents(1))),
            Some(Money::from_cents(1000))
        );

        let variable = Product {
            variable_price: true,
            ..fixed(0)
        };
        assert_eq!(
            resolve_unit_price(&variable, Some(Money::from_cents(1550))),
            Some(Money::from_cents(1550))
        );
        assert_eq!(resolve_unit_price(&variable, None), None);
    }
}
