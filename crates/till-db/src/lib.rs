//! # till-db: Database Layer for Till POS
//!
//! SQLite storage for the catalog and sales, plus the [`SaleEngine`] that
//! runs post, edit and void as single transactions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Data Flow                               │
//! │                                                                         │
//! │  HTTP handler (POST /api/sales)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     till-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  SaleEngine   │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (engine.rs)  │    │               │    │  (embedded)  │  │   │
//! │  │   │               │───►│ catalog       │    │              │  │   │
//! │  │   │ post/edit/    │    │ sale          │    │ 001_initial  │  │   │
//! │  │   │ void/get/list │    │ stock         │    │              │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ till-core: validate, price, plan stock            │   │
//! │  └───────────┼─────────────────────────────────────────────────────┘   │
//! │              ▼                                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and engine error types
//! - [`repository`] - Catalog, sale and stock SQL
//! - [`engine`] - Transactional sale operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_core::{Caller, SaleRequest, SaleItemRequest};
//! use till_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("till.db")).await?;
//!
//! let request = SaleRequest::new(1).item(SaleItemRequest::new(7, 2));
//! let sale = db.engine().post(&Caller::cashier(42), &request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::SaleEngine;
pub use error::{DbError, DbResult, EngineError, EngineResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::{CatalogRepository, NewProduct};
pub use repository::sale::SaleRepository;
