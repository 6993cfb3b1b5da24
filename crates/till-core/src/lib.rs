//! # till-core: Pure Sale Logic for Till POS
//!
//! This crate is the **heart** of the sale transaction engine. It contains
//! everything that decides whether a sale is legal and what it costs, as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 till-server (REST, axum)                        │   │
//! │  │        POST /sales ──► PUT /sales/:id ──► DELETE /sales/:id     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ catalog   │  │validation │  │  pricing  │  │   stock   │  │   │
//! │  │   │ Snapshot  │─►│ Validated │─►│  totals   │  │ StockPlan │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              till-db (SQLite + SaleEngine transactions)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, SaleLineItem, Caller, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`request`] - Loosely-typed wire payloads for post/edit/list
//! - [`catalog`] - In-memory catalog snapshot used during validation
//! - [`validation`] - Turns payloads into verified sale plans
//! - [`pricing`] - Line subtotals and sale totals
//! - [`stock`] - Stock deltas for post/edit/void
//! - [`policy`] - Role and ownership rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::money::Money;
//!
//! let unit = Money::from_cents(1000); // 10.00
//! let extra_cheese = Money::from_cents(200);
//!
//! let line = unit.multiply_quantity(2) + extra_cheese;
//! assert_eq!(line.to_string(), "22.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod money;
pub mod policy;
pub mod pricing;
pub mod request;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{CatalogKeys, CatalogSnapshot};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use request::{AddOnRequest, EditItemRequest, EditSaleRequest, SaleFilter, SaleItemRequest, SaleRequest};
pub use stock::StockPlan;
pub use types::*;
pub use validation::{ValidatedAddOn, ValidatedEdit, ValidatedLine, ValidatedLineEdit, ValidatedSale};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Raw stock value meaning "not tracked / unlimited".
///
/// Products created without a stock count get this value. It never leaves
/// the persistence layer; in Rust the state is [`StockLevel::Untracked`].
pub const UNTRACKED_STOCK: i64 = -1;

/// Quantity used for an add-on when the request omits it.
pub const DEFAULT_ADD_ON_QUANTITY: i64 = 1;
