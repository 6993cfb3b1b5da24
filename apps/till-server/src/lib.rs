//! # Till Server
//!
//! REST API over the sale transaction engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Server                                      │
//! │                                                                         │
//! │  POS client ──► HTTP (4000) ──► CurrentUser ──► SaleEngine ──► SQLite │
//! │                  Bearer JWT      (Caller)        (till-db)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use till_db::Database;

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

pub use auth::{CurrentUser, JwtManager};
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, jwt: JwtManager) -> Self {
        AppState {
            db,
            jwt: Arc::new(jwt),
        }
    }
}
