//! # Validation Module
//!
//! Turns loosely-typed sale payloads into verified plans that pricing and
//! persistence can consume without re-checking anything.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Pipeline                                │
//! │                                                                         │
//! │  SaleRequest (serde_json::Value scalars)                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Structure: ids, quantities, prices, flags parse     → InvalidInput    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  References: product / payment method in snapshot   → NotFound        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Add-ons: exists, qty/price sane, category allowed  → InvalidAddOn    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Stock: aggregated per product vs snapshot          → InsufficientStock│
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ValidatedSale / ValidatedEdit (typed, priced, no Value left)          │
//! │                                                                         │
//! │  Nothing in this module writes. The first violation aborts.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::{CatalogSnapshot, Product, SaleItemRequest, SaleRequest, StockLevel};
//! use till_core::validation::validate_sale;
//!
//! let snapshot = CatalogSnapshot::new()
//!     .with_payment_method(1)
//!     .with_product(Product {
//!         id: 7,
//!         name: "Coffee".to_string(),
//!         price_cents: 450,
//!         variable_price: false,
//!         stock: StockLevel::Untracked,
//!         suspended: false,
//!         category: None,
//!     });
//!
//! let request = SaleRequest::new(1).item(SaleItemRequest::new(7, 2));
//! let sale = validate_sale(&request, &snapshot).unwrap();
//! assert_eq!(sale.total().cents(), 900);
//! ```

use std::collections::HashSet;

use serde_json::Value;

use crate::catalog::CatalogSnapshot;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{self, resolve_unit_price};
use crate::request::{AddOnRequest, EditItemRequest, EditSaleRequest, SaleItemRequest, SaleRequest};
use crate::stock::StockPlan;
use crate::types::{Product, SaleDetail};
use crate::DEFAULT_ADD_ON_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Validated Plans
// =============================================================================

/// A post request that passed every rule, with prices resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSale {
    pub payment_method_id: i64,
    pub lines: Vec<ValidatedLine>,
}

impl ValidatedSale {
    pub fn total(&self) -> Money {
        pricing::sale_total(&self.lines)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLine {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    /// Resolved and frozen.
    pub unit_price: Money,
    pub is_delivery: bool,
    pub add_ons: Vec<ValidatedAddOn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedAddOn {
    pub additional_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
}

/// An edit request resolved against the sale's persisted lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEdit {
    /// New payment method, or the current one if the request kept it.
    pub payment_method_id: i64,
    pub lines: Vec<ValidatedLineEdit>,
}

/// New state of one existing line.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLineEdit {
    pub item_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub unit_price: Money,
    pub is_delivery: bool,
}

// =============================================================================
// Post
// =============================================================================

/// Validates a post request against a catalog snapshot.
///
/// ## Rules
/// - `paymentMethodId` present and known; `items` non-empty
/// - every product exists; quantity is a positive integer
/// - variable-price lines carry a positive price, fixed-price lines use the
///   catalog price
/// - `isDelivery`, when present, is a boolean
/// - add-ons exist, have sane quantity/price and an eligible category
/// - tracked stock covers the summed quantity of each product
pub fn validate_sale(request: &SaleRequest, snapshot: &CatalogSnapshot) -> CoreResult<ValidatedSale> {
    let payment_method_id = parse_id(request.payment_method_id.as_ref(), "paymentMethodId")?;

    let items = match request.items.as_deref() {
        Some(items) if !items.is_empty() => items,
        _ => {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            }
            .into())
        }
    };

    if !snapshot.has_payment_method(payment_method_id) {
        return Err(CoreError::not_found("PaymentMethod", payment_method_id));
    }

    let lines = items
        .iter()
        .enumerate()
        .map(|(index, item)| validate_line(index, item, snapshot))
        .collect::<CoreResult<Vec<_>>>()?;

    let sale = ValidatedSale {
        payment_method_id,
        lines,
    };

    StockPlan::for_post(&sale)?.check(snapshot)?;

    Ok(sale)
}

fn validate_line(index: usize, item: &SaleItemRequest, snapshot: &CatalogSnapshot) -> CoreResult<ValidatedLine> {
    let field = |name: &str| format!("items[{index}].{name}");

    let product_id = parse_id(item.product_id.as_ref(), &field("productId"))?;
    let product = snapshot
        .product(product_id)
        .ok_or_else(|| CoreError::not_found("Product", product_id))?;

    let quantity = parse_quantity(item.quantity.as_ref(), &field("quantity"))?;

    let supplied = if product.variable_price {
        Some(parse_unit_price(item.unit_price.as_ref(), &field("unitPrice"))?)
    } else {
        None
    };
    let unit_price = resolve_unit_price(product, supplied).ok_or_else(|| ValidationError::Required {
        field: field("unitPrice"),
    })?;

    let is_delivery = parse_flag(item.is_delivery.as_ref(), &field("isDelivery"))?.unwrap_or(false);

    let add_ons = item
        .additionals
        .iter()
        .flatten()
        .map(|add_on| validate_add_on(product, add_on, snapshot))
        .collect::<CoreResult<Vec<_>>>()?;

    Ok(ValidatedLine {
        product_id,
        product_name: product.name.clone(),
        quantity,
        unit_price,
        is_delivery,
        add_ons,
    })
}

fn validate_add_on(product: &Product, add_on: &AddOnRequest, snapshot: &CatalogSnapshot) -> CoreResult<ValidatedAddOn> {
    let additional_id = add_on
        .additional_id
        .as_ref()
        .and_then(lenient_id)
        .ok_or_else(|| CoreError::invalid_add_on(&product.name, "additionalId is missing or malformed"))?;

    let additional = snapshot
        .additional(additional_id)
        .ok_or_else(|| CoreError::invalid_add_on(&product.name, format!("add-on {additional_id} does not exist")))?;

    let quantity = match add_on.quantity.as_ref() {
        None => DEFAULT_ADD_ON_QUANTITY,
        Some(value) => integer(value)
            .filter(|quantity| *quantity > 0)
            .ok_or_else(|| CoreError::invalid_add_on(&product.name, "add-on quantity must be a positive integer"))?,
    };

    let unit_price = add_on
        .unit_price
        .as_ref()
        .and_then(decimal)
        .and_then(Money::from_decimal)
        .filter(|price| !price.is_negative())
        .ok_or_else(|| CoreError::invalid_add_on(&product.name, "add-on unit price must be a non-negative number"))?;

    if !snapshot.is_eligible(product.id, additional.category_id) {
        return Err(CoreError::invalid_add_on(
            &product.name,
            format!("add-on '{}' is not allowed for this product", additional.name),
        ));
    }

    Ok(ValidatedAddOn {
        additional_id,
        quantity,
        unit_price,
    })
}

// =============================================================================
// Edit
// =============================================================================

/// Validates an edit request against the sale's current persisted state.
///
/// Lines not mentioned keep their state. Fixed-price lines keep their frozen
/// price; variable-price lines may take a new one. Stock is checked on the
/// net change per product, against current stock.
pub fn validate_edit(
    before: &SaleDetail,
    request: &EditSaleRequest,
    snapshot: &CatalogSnapshot,
) -> CoreResult<ValidatedEdit> {
    let payment_method_id = match request.payment_method_id.as_ref() {
        None => before.sale.payment_method_id,
        Some(value) => {
            let id = parse_id(Some(value), "paymentMethodId")?;
            if !snapshot.has_payment_method(id) {
                return Err(CoreError::not_found("PaymentMethod", id));
            }
            id
        }
    };

    let items = request.items.as_deref().unwrap_or(&[]);
    if items.is_empty() && request.payment_method_id.is_none() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        }
        .into());
    }

    let mut seen = HashSet::with_capacity(items.len());
    let mut lines = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let line = validate_line_edit(index, item, before, snapshot)?;
        if !seen.insert(line.item_id) {
            return Err(ValidationError::Duplicate {
                field: format!("items[{index}].itemId"),
                value: line.item_id.to_string(),
            }
            .into());
        }
        lines.push(line);
    }

    let edit = ValidatedEdit {
        payment_method_id,
        lines,
    };

    StockPlan::for_edit(&edit)?.check(snapshot)?;

    Ok(edit)
}

fn validate_line_edit(
    index: usize,
    item: &EditItemRequest,
    before: &SaleDetail,
    snapshot: &CatalogSnapshot,
) -> CoreResult<ValidatedLineEdit> {
    let field = |name: &str| format!("items[{index}].{name}");

    let item_id = parse_id(item.item_id.as_ref(), &field("itemId"))?;
    let current = before
        .line(item_id)
        .ok_or_else(|| CoreError::not_found("SaleItem", item_id))?;

    let product = snapshot
        .product(current.item.product_id)
        .ok_or_else(|| CoreError::not_found("Product", current.item.product_id))?;

    let new_quantity = parse_quantity(item.quantity.as_ref(), &field("quantity"))?;

    let unit_price = match item.unit_price.as_ref() {
        Some(value) if product.variable_price => parse_unit_price(Some(value), &field("unitPrice"))?,
        _ => current.item.unit_price(),
    };

    let is_delivery = parse_flag(item.is_delivery.as_ref(), &field("isDelivery"))?.unwrap_or(current.item.is_delivery);

    Ok(ValidatedLineEdit {
        item_id,
        product_id: product.id,
        product_name: product.name.clone(),
        old_quantity: current.item.quantity,
        new_quantity,
        unit_price,
        is_delivery,
    })
}

// =============================================================================
// Scalar Parsing
// =============================================================================

/// Reads a JSON number or numeric string as a float.
fn decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                None
            } else {
                text.parse::<f64>().ok()
            }
        }
        _ => None,
    }
}

/// Reads a whole number. `2`, `2.0` and `"2"` all qualify; `2.5` does not.
fn integer(value: &Value) -> Option<i64> {
    if let Value::Number(number) = value {
        if let Some(int) = number.as_i64() {
            return Some(int);
        }
    }

    let float = decimal(value)?;
    if float.is_finite() && float.fract() == 0.0 && float >= i64::MIN as f64 && float < i64::MAX as f64 {
        Some(float as i64)
    } else {
        None
    }
}

/// A positive integer id, or `None`.
pub(crate) fn lenient_id(value: &Value) -> Option<i64> {
    integer(value).filter(|id| *id > 0)
}

fn parse_id(value: Option<&Value>, field: &str) -> ValidationResult<i64> {
    let value = value.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })?;
    let id = integer(value).ok_or_else(|| ValidationError::invalid_format(field, "must be an integer id"))?;
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(id)
}

fn parse_quantity(value: Option<&Value>, field: &str) -> ValidationResult<i64> {
    let value = value.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })?;
    let quantity = integer(value).ok_or_else(|| ValidationError::invalid_format(field, "must be a whole number"))?;
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(quantity)
}

fn parse_unit_price(value: Option<&Value>, field: &str) -> ValidationResult<Money> {
    let value = value.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })?;
    let price = decimal(value)
        .and_then(Money::from_decimal)
        .ok_or_else(|| ValidationError::invalid_format(field, "must be a finite number"))?;
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(price)
}

fn parse_flag(value: Option<&Value>, field: &str) -> ValidationResult<Option<bool>> {
    match value {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(_) => Err(ValidationError::invalid_format(field, "must be a boolean")),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
