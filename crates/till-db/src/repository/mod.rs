//! # Repository Module
//!
//! SQL for the catalog, sales and the stock ledger.
//!
//! ## Two Calling Styles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Repository structs (own a pool clone)                                 │
//! │  ├── CatalogRepository::snapshot(&keys)     reads, seeding helpers     │
//! │  └── SaleRepository::get / list             reads                      │
//! │                                                                         │
//! │  Free functions (take &mut SqliteConnection)                           │
//! │  ├── catalog::load_snapshot                                            │
//! │  ├── sale::insert_sale / insert_line / update_line / delete_sale ...   │
//! │  └── stock::apply_plan                                                 │
//! │       │                                                                 │
//! │       └── called by SaleEngine with its open transaction, so every    │
//! │           write of one operation commits or rolls back together        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Snapshot loading, seeding
//! - [`SaleRepository`](sale::SaleRepository) - Sale reads and listing

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{QueryBuilder, Sqlite};

pub mod catalog;
pub mod sale;
pub mod stock;

/// Formats a timestamp the way every TEXT timestamp column stores it.
///
/// Fixed microsecond precision with a `Z` suffix keeps lexicographic order
/// equal to chronological order, which range filters rely on.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Appends `id1, id2, ...)` as bound parameters, closing an `IN (` list.
pub(crate) fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, ids: impl IntoIterator<Item = i64>) {
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");
}
