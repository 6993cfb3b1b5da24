//! # Catalog Snapshot
//!
//! The slice of the catalog a single request needs, read once and held in
//! memory while the request is validated and priced.
//!
//! ```text
//!   SaleRequest ──► CatalogKeys ──► (till-db loader) ──► CatalogSnapshot
//!                   product ids                          products
//!                   add-on ids                           additionals
//!                   payment method                       eligibility
//!                                                        payment methods
//! ```
//!
//! The snapshot only holds what was found. A key with no entry is reported
//! by the validator, which knows which line referenced it.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::request::{EditSaleRequest, SaleRequest};
use crate::types::{AdditionalItem, Product, SaleDetail};
use crate::validation::lenient_id;

// =============================================================================
// Keys
// =============================================================================

/// Identifiers a request references.
///
/// Unparseable ids are skipped here; the validator rejects them with the
/// proper field path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogKeys {
    pub product_ids: BTreeSet<i64>,
    pub additional_ids: BTreeSet<i64>,
    pub payment_method_id: Option<i64>,
}

impl CatalogKeys {
    /// Keys referenced by a post request.
    pub fn for_sale(request: &SaleRequest) -> Self {
        let mut keys = CatalogKeys {
            payment_method_id: request.payment_method_id.as_ref().and_then(lenient_id),
            ..Default::default()
        };

        for item in request.items.iter().flatten() {
            if let Some(id) = item.product_id.as_ref().and_then(lenient_id) {
                keys.product_ids.insert(id);
            }
            for add_on in item.additionals.iter().flatten() {
                if let Some(id) = add_on.additional_id.as_ref().and_then(lenient_id) {
                    keys.additional_ids.insert(id);
                }
            }
        }

        keys
    }

    /// Keys needed to validate an edit of an existing sale.
    ///
    /// Products come from the persisted lines, not the request: an edit can
    /// only touch products the sale already has.
    pub fn for_edit(before: &SaleDetail, request: &EditSaleRequest) -> Self {
        CatalogKeys {
            product_ids: before.product_ids().into_iter().collect(),
            additional_ids: BTreeSet::new(),
            payment_method_id: request.payment_method_id.as_ref().and_then(lenient_id),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Products, add-ons and eligibility links as of one consistent read.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: HashMap<i64, Product>,
    additionals: HashMap<i64, AdditionalItem>,
    /// product id → allowed add-on category ids
    eligibility: HashMap<i64, HashSet<i64>>,
    payment_methods: HashSet<i64>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.insert_product(product);
        self
    }

    pub fn with_additional(mut self, additional: AdditionalItem) -> Self {
        self.insert_additional(additional);
        self
    }

    /// Links an add-on category to a product.
    pub fn allow_category(mut self, product_id: i64, category_id: i64) -> Self {
        self.insert_eligibility(product_id, category_id);
        self
    }

    pub fn with_payment_method(mut self, payment_method_id: i64) -> Self {
        self.insert_payment_method(payment_method_id);
        self
    }

    pub fn insert_product(&mut self, product: Product) {
        self.products.insert(product.id, product);
    }

    pub fn insert_additional(&mut self, additional: AdditionalItem) {
        self.additionals.insert(additional.id, additional);
    }

    pub fn insert_eligibility(&mut self, product_id: i64, category_id: i64) {
        self.eligibility.entry(product_id).or_default().insert(category_id);
    }

    pub fn insert_payment_method(&mut self, payment_method_id: i64) {
        self.payment_methods.insert(payment_method_id);
    }

    #[inline]
    pub fn product(&self, id: i64) -> Option<&Product> {
        self.products.get(&id)
    }

    #[inline]
    pub fn additional(&self, id: i64) -> Option<&AdditionalItem> {
        self.additionals.get(&id)
    }

    #[inline]
    pub fn has_payment_method(&self, id: i64) -> bool {
        self.payment_methods.contains(&id)
    }

    /// Checks the product's eligibility set for an add-on category.
    pub fn is_eligible(&self, product_id: i64, category_id: i64) -> bool {
        self.eligibility
            .get(&product_id)
            .is_some_and(|categories| categories.contains(&category_id))
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}
