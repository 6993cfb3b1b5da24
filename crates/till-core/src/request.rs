//! # Request Payloads
//!
//! Wire shapes for post, edit and list as sent by POS clients.
//!
//! Scalar fields are kept as raw JSON values: older clients send numbers as
//! strings and booleans as whatever the form produced. Nothing here is
//! trusted; [`crate::validation`] turns these into verified plans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use ts_rs::TS;

// =============================================================================
// Post
// =============================================================================

/// Body of a post-sale request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct SaleRequest {
    #[ts(type = "number | string | null")]
    pub payment_method_id: Option<Value>,
    pub items: Option<Vec<SaleItemRequest>>,
}

/// One requested sale line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct SaleItemRequest {
    #[ts(type = "number | string | null")]
    pub product_id: Option<Value>,
    #[ts(type = "number | string | null")]
    pub quantity: Option<Value>,
    /// Required for variable-price products, ignored otherwise.
    #[ts(type = "number | string | null")]
    pub unit_price: Option<Value>,
    #[ts(type = "boolean | undefined")]
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub is_delivery: Option<Value>,
    pub additionals: Option<Vec<AddOnRequest>>,
}

/// One add-on selected on a sale line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct AddOnRequest {
    #[ts(type = "number | string | null")]
    pub additional_id: Option<Value>,
    /// Defaults to 1 when omitted.
    #[ts(type = "number | string | null")]
    pub quantity: Option<Value>,
    #[ts(type = "number | string | null")]
    pub unit_price: Option<Value>,
}

impl SaleRequest {
    /// Starts a request paid with the given payment method.
    pub fn new(payment_method_id: i64) -> Self {
        SaleRequest {
            payment_method_id: Some(Value::from(payment_method_id)),
            items: Some(Vec::new()),
        }
    }

    /// Appends a line.
    pub fn item(mut self, item: SaleItemRequest) -> Self {
        self.items.get_or_insert_with(Vec::new).push(item);
        self
    }
}

impl SaleItemRequest {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        SaleItemRequest {
            product_id: Some(Value::from(product_id)),
            quantity: Some(Value::from(quantity)),
            ..Default::default()
        }
    }

    pub fn unit_price(mut self, price: f64) -> Self {
        self.unit_price = Some(Value::from(price));
        self
    }

    pub fn delivery(mut self, is_delivery: bool) -> Self {
        self.is_delivery = Some(Value::Bool(is_delivery));
        self
    }

    pub fn add_on(mut self, add_on: AddOnRequest) -> Self {
        self.additionals.get_or_insert_with(Vec::new).push(add_on);
        self
    }
}

impl AddOnRequest {
    /// An add-on with the default quantity.
    pub fn new(additional_id: i64, unit_price: f64) -> Self {
        AddOnRequest {
            additional_id: Some(Value::from(additional_id)),
            quantity: None,
            unit_price: Some(Value::from(unit_price)),
        }
    }

    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(Value::from(quantity));
        self
    }
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only an absent field
/// (filled by `#[serde(default)]`) is `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

// =============================================================================
// Edit
// =============================================================================

/// Body of an edit-sale request.
///
/// Only existing lines can change; adding or removing lines is not supported.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct EditSaleRequest {
    /// Omitted = keep the current payment method.
    #[ts(type = "number | string | null")]
    pub payment_method_id: Option<Value>,
    pub items: Option<Vec<EditItemRequest>>,
}

/// Requested change to one existing sale line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct EditItemRequest {
    /// Id of the SaleLineItem being changed.
    #[ts(type = "number | string | null")]
    pub item_id: Option<Value>,
    #[ts(type = "number | string | null")]
    pub quantity: Option<Value>,
    /// Variable-price lines only. Omitted = keep the snapshot.
    #[ts(type = "number | string | null")]
    pub unit_price: Option<Value>,
    /// Omitted = keep the current flag.
    #[ts(type = "boolean | undefined")]
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub is_delivery: Option<Value>,
}

impl EditSaleRequest {
    pub fn new() -> Self {
        EditSaleRequest {
            payment_method_id: None,
            items: Some(Vec::new()),
        }
    }

    pub fn payment_method(mut self, payment_method_id: i64) -> Self {
        self.payment_method_id = Some(Value::from(payment_method_id));
        self
    }

    pub fn item(mut self, item: EditItemRequest) -> Self {
        self.items.get_or_insert_with(Vec::new).push(item);
        self
    }
}

impl EditItemRequest {
    pub fn new(item_id: i64, quantity: i64) -> Self {
        EditItemRequest {
            item_id: Some(Value::from(item_id)),
            quantity: Some(Value::from(quantity)),
            ..Default::default()
        }
    }

    pub fn unit_price(mut self, price: f64) -> Self {
        self.unit_price = Some(Value::from(price));
        self
    }

    pub fn delivery(mut self, is_delivery: bool) -> Self {
        self.is_delivery = Some(Value::Bool(is_delivery));
        self
    }
}

// =============================================================================
// List
// =============================================================================

/// Filters for listing sales. All bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default, rename_all = "camelCase")]
pub struct SaleFilter {
    #[ts(as = "Option<String>")]
    pub start: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub end: Option<DateTime<Utc>>,
    pub payment_method_id: Option<i64>,
    /// Sales with at least one line of this product.
    pub product_id: Option<i64>,
}
